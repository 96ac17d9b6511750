use std::sync::Arc;

use crate::domain::{AudioAsset, CaptionResult, WaveformAsset};

use super::audio_normalizer::{AudioNormalizer, FormatError};
use super::model_handle::{InferenceError, ModelHandle};

#[derive(Clone)]
pub struct CaptionService {
    model: Arc<ModelHandle>,
    normalizer: Arc<AudioNormalizer>,
}

impl CaptionService {
    pub fn new(model: Arc<ModelHandle>, normalizer: Arc<AudioNormalizer>) -> Self {
        Self { model, normalizer }
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_ready()
    }

    /// Captions one upload.
    ///
    /// The pipeline runs on its own task: if the caller goes away the
    /// inference still completes and its result is dropped.
    pub async fn caption(
        &self,
        asset: AudioAsset,
        tag: Option<String>,
    ) -> Result<CaptionResult, ServiceError> {
        if !self.model.is_ready() {
            tracing::warn!(state = %self.model.state(), "Caption request rejected: model not ready");
            return Err(ServiceError::ModelNotReady);
        }

        let model = Arc::clone(&self.model);
        let normalizer = Arc::clone(&self.normalizer);

        tokio::spawn(async move { run_pipeline(&model, &normalizer, asset, tag).await })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Caption task aborted");
                ServiceError::Internal(format!("caption task failed: {e}"))
            })?
    }
}

async fn run_pipeline(
    model: &ModelHandle,
    normalizer: &AudioNormalizer,
    asset: AudioAsset,
    tag: Option<String>,
) -> Result<CaptionResult, ServiceError> {
    let waveform = normalizer.normalize(asset).await.map_err(|e| {
        tracing::warn!(error = %e, "Audio normalization failed");
        ServiceError::from(e)
    })?;

    let outcome = model.generate_caption(&waveform).await;
    release_waveform(waveform);

    let caption = outcome.map_err(|e| {
        tracing::error!(error = %e, "Caption generation failed");
        ServiceError::from(e)
    })?;

    Ok(CaptionResult::new(caption, tag))
}

fn release_waveform(waveform: WaveformAsset) {
    let path = waveform.path().to_path_buf();
    if let Err(e) = waveform.release() {
        tracing::warn!(error = %e, path = %path.display(), "Failed to delete waveform scratch file");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("model not ready")]
    ModelNotReady,
    #[error("invalid audio: {0}")]
    InvalidAudio(#[source] FormatError),
    #[error("caption generation failed: {0}")]
    GenerationFailed(#[source] InferenceError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Summary safe to hand back to a client.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::ModelNotReady => {
                "Model not initialized. Please try again later.".to_string()
            }
            ServiceError::InvalidAudio(FormatError::UnsupportedType(content_type)) => format!(
                "Invalid file type '{}'. Please upload an audio file.",
                content_type
            ),
            ServiceError::InvalidAudio(FormatError::EmptyUpload) => {
                "Uploaded file is empty.".to_string()
            }
            ServiceError::InvalidAudio(_) => {
                "Unable to decode the uploaded audio. Please upload a supported audio format."
                    .to_string()
            }
            ServiceError::GenerationFailed(_) => {
                "Failed to generate caption. Please try again.".to_string()
            }
            ServiceError::Internal(_) => {
                "Internal error while processing audio.".to_string()
            }
        }
    }
}

impl From<FormatError> for ServiceError {
    fn from(e: FormatError) -> Self {
        match e {
            FormatError::UnsupportedType(_) | FormatError::EmptyUpload | FormatError::Decode(_) => {
                ServiceError::InvalidAudio(e)
            }
            FormatError::Scratch(_) | FormatError::WorkerFailed(_) => {
                ServiceError::Internal(e.to_string())
            }
        }
    }
}

impl From<InferenceError> for ServiceError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::NotLoaded => ServiceError::ModelNotReady,
            other => ServiceError::GenerationFailed(other),
        }
    }
}
