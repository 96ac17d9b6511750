use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::services::LoadError;
use crate::domain::{ComputeDevice, DecodingParams};

/// A loaded captioning model. Calls take `&mut self`: one inference at a time.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Raw model output, expected to be a list of caption strings.
    async fn generate(
        &mut self,
        waveform: &Path,
        params: &DecodingParams,
    ) -> Result<serde_json::Value, CaptionerError>;

    fn device(&self) -> ComputeDevice;

    /// Tear the model down and reclaim its memory. Called once, after which
    /// the captioner is dropped.
    async fn release(&mut self);
}

#[async_trait]
pub trait CaptionerLoader: Send + Sync {
    fn requires_local_weights(&self) -> bool {
        true
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Captioner>, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub weights_path: PathBuf,
    pub device: ComputeDevice,
    pub cpu_threads: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptionerError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model terminated: {0}")]
    Terminated(String),
}
