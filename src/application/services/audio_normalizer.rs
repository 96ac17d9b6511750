use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::application::ports::{AudioTranscoder, TranscodeError};
use crate::domain::{AudioAsset, WaveformAsset};

pub const CANONICAL_SAMPLE_RATE: u32 = 44_100;

/// Turns an upload into a canonical mono WAV in scratch storage.
pub struct AudioNormalizer {
    transcoder: Arc<dyn AudioTranscoder>,
    scratch_dir: PathBuf,
    sample_rate: u32,
    permits: Arc<Semaphore>,
}

impl AudioNormalizer {
    pub fn new(
        transcoder: Arc<dyn AudioTranscoder>,
        scratch_dir: PathBuf,
        sample_rate: u32,
        max_concurrent_decodes: usize,
    ) -> Result<Self, FormatError> {
        std::fs::create_dir_all(&scratch_dir).map_err(FormatError::Scratch)?;
        Ok(Self {
            transcoder,
            scratch_dir,
            sample_rate,
            permits: Arc::new(Semaphore::new(max_concurrent_decodes.max(1))),
        })
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        &self.scratch_dir
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[tracing::instrument(
        skip(self, asset),
        fields(
            content_type = %asset.content_type,
            bytes = asset.size_bytes(),
        )
    )]
    pub async fn normalize(&self, asset: AudioAsset) -> Result<WaveformAsset, FormatError> {
        if !asset.is_audio() {
            tracing::warn!("Rejecting upload with non-audio content type");
            return Err(FormatError::UnsupportedType(asset.content_type));
        }

        if asset.bytes.is_empty() {
            return Err(FormatError::EmptyUpload);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FormatError::WorkerFailed(e.to_string()))?;

        let transcoder = Arc::clone(&self.transcoder);
        let scratch_dir = self.scratch_dir.clone();
        let sample_rate = self.sample_rate;

        tokio::task::spawn_blocking(move || {
            normalize_blocking(transcoder.as_ref(), &scratch_dir, sample_rate, &asset)
        })
        .await
        .map_err(|e| FormatError::WorkerFailed(format!("task join error: {e}")))?
    }
}

fn normalize_blocking(
    transcoder: &dyn AudioTranscoder,
    scratch_dir: &std::path::Path,
    sample_rate: u32,
    asset: &AudioAsset,
) -> Result<WaveformAsset, FormatError> {
    let extension = asset.extension();
    let suffix = extension
        .as_deref()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let mut raw = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(scratch_dir)
        .map_err(FormatError::Scratch)?;
    raw.write_all(&asset.bytes).map_err(FormatError::Scratch)?;
    raw.flush().map_err(FormatError::Scratch)?;
    let raw_path = raw.into_temp_path();

    let waveform_path = tempfile::Builder::new()
        .prefix("waveform-")
        .suffix(".wav")
        .tempfile_in(scratch_dir)
        .map_err(FormatError::Scratch)?
        .into_temp_path();

    let stats = transcoder
        .transcode(&raw_path, extension.as_deref(), &waveform_path, sample_rate)
        .map_err(|e| match e {
            TranscodeError::Io(io) => FormatError::Scratch(io),
            other => FormatError::Decode(other),
        })?;

    if let Err(e) = raw_path.close() {
        tracing::warn!(error = %e, "Failed to delete raw upload scratch file");
    }

    tracing::debug!(
        source_sample_rate = stats.source_sample_rate,
        source_channels = stats.source_channels,
        frames = stats.frames,
        sample_rate,
        "Upload normalized to canonical waveform"
    );

    Ok(WaveformAsset::new(waveform_path, sample_rate, stats.frames))
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    #[error("uploaded file is empty")]
    EmptyUpload,
    #[error(transparent)]
    Decode(TranscodeError),
    #[error("scratch storage error: {0}")]
    Scratch(#[source] std::io::Error),
    #[error("normalization worker failed: {0}")]
    WorkerFailed(String),
}
