use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{Captioner, CaptionerError, CaptionerLoader, ModelSpec};
use crate::application::services::LoadError;
use crate::domain::{ComputeDevice, DecodingParams};

pub const MOCK_CAPTION: &str = "A mock caption describing the uploaded audio.";

pub struct MockCaptionerLoader {
    caption: String,
    delay: Duration,
}

impl MockCaptionerLoader {
    pub fn new(caption: impl Into<String>, delay: Duration) -> Self {
        Self {
            caption: caption.into(),
            delay,
        }
    }
}

impl Default for MockCaptionerLoader {
    fn default() -> Self {
        Self::new(MOCK_CAPTION, Duration::ZERO)
    }
}

#[async_trait]
impl CaptionerLoader for MockCaptionerLoader {
    fn requires_local_weights(&self) -> bool {
        false
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Captioner>, LoadError> {
        Ok(Box::new(MockCaptioner {
            caption: self.caption.clone(),
            delay: self.delay,
            device: spec.device,
        }))
    }
}

pub struct MockCaptioner {
    caption: String,
    delay: Duration,
    device: ComputeDevice,
}

#[async_trait]
impl Captioner for MockCaptioner {
    async fn generate(
        &mut self,
        _waveform: &Path,
        _params: &DecodingParams,
    ) -> Result<serde_json::Value, CaptionerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(serde_json::json!([self.caption]))
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }

    async fn release(&mut self) {}
}
