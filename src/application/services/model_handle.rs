use serde_json::Value;
use tokio::sync::{Mutex, watch};

use crate::application::ports::{Captioner, CaptionerError};
use crate::domain::{ComputeDevice, DecodingParams, ModelState, ModelStatus, WaveformAsset, WeightSource};

/// The process-wide captioning model slot.
///
/// The captioner lives behind a FIFO mutex, so at most one inference runs at a
/// time and waiters are served in arrival order. State is published on a watch
/// channel so readiness checks never queue behind an inference.
pub struct ModelHandle {
    weights: WeightSource,
    params: DecodingParams,
    status: watch::Sender<ModelStatus>,
    gate: Mutex<Option<Box<dyn Captioner>>>,
}

impl ModelHandle {
    pub fn new(weights: WeightSource) -> Self {
        Self::with_params(weights, DecodingParams::CAPTION_POLICY)
    }

    fn with_params(weights: WeightSource, params: DecodingParams) -> Self {
        let (status, _) = watch::channel(ModelStatus::unloaded());
        Self {
            weights,
            params,
            status,
            gate: Mutex::new(None),
        }
    }

    pub fn weights(&self) -> &WeightSource {
        &self.weights
    }

    pub fn params(&self) -> &DecodingParams {
        &self.params
    }

    pub fn status(&self) -> ModelStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> ModelState {
        self.status.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.status.borrow().is_ready()
    }

    pub fn device(&self) -> Option<ComputeDevice> {
        self.status.borrow().device
    }

    pub fn subscribe(&self) -> watch::Receiver<ModelStatus> {
        self.status.subscribe()
    }

    #[tracing::instrument(
        skip(self, waveform),
        fields(
            path = %waveform.path().display(),
            duration_secs = waveform.duration_secs(),
        )
    )]
    pub async fn generate_caption(&self, waveform: &WaveformAsset) -> Result<String, InferenceError> {
        tracing::debug!("Waiting for inference gate");
        let mut slot = self.gate.lock().await;

        let captioner = slot.as_mut().ok_or(InferenceError::NotLoaded)?;

        tracing::debug!(
            beam_width = self.params.beam_width,
            max_length = self.params.max_length,
            temperature = self.params.temperature,
            "Generating caption"
        );

        let output = match captioner.generate(waveform.path(), &self.params).await {
            Ok(output) => output,
            Err(CaptionerError::Terminated(reason)) => {
                tracing::error!(reason = %reason, "Captioning model terminated unexpectedly");
                if let Some(mut dead) = slot.take() {
                    dead.release().await;
                }
                self.publish(ModelState::Failed, None);
                return Err(InferenceError::ModelFailure(reason));
            }
            Err(CaptionerError::Inference(reason)) => {
                return Err(InferenceError::ModelFailure(reason));
            }
        };

        drop(slot);

        let caption = first_caption(&output)?;
        tracing::info!(chars = caption.len(), "Caption generated");
        Ok(caption)
    }

    pub(crate) fn publish(&self, state: ModelState, device: Option<ComputeDevice>) {
        let previous = self.status.send_replace(ModelStatus { state, device });
        if previous.state != state {
            tracing::info!(from = %previous.state, to = %state, "Model state changed");
        }
    }

    pub(crate) async fn install(&self, captioner: Box<dyn Captioner>) -> ComputeDevice {
        let device = captioner.device();
        let mut slot = self.gate.lock().await;
        *slot = Some(captioner);
        self.publish(ModelState::Ready, Some(device));
        device
    }

    pub(crate) async fn take(&self) -> Option<Box<dyn Captioner>> {
        self.gate.lock().await.take()
    }
}

fn first_caption(output: &Value) -> Result<String, InferenceError> {
    let captions = output.as_array().ok_or_else(|| {
        InferenceError::EmptyOrMalformedOutput(format!("expected a list, got {}", kind_of(output)))
    })?;

    let first = captions
        .first()
        .ok_or_else(|| InferenceError::EmptyOrMalformedOutput("empty caption list".to_string()))?;

    let text = first.as_str().ok_or_else(|| {
        InferenceError::EmptyOrMalformedOutput(format!(
            "expected a string caption, got {}",
            kind_of(first)
        ))
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(InferenceError::EmptyOrMalformedOutput(
            "first caption is empty".to_string(),
        ));
    }

    Ok(text.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model is not loaded")]
    NotLoaded,
    #[error("model failure: {0}")]
    ModelFailure(String),
    #[error("empty or malformed model output: {0}")]
    EmptyOrMalformedOutput(String),
}
