use std::path::Path;

/// Decodes an arbitrary container into canonical mono PCM and writes it as WAV.
///
/// Blocking; callers run it on the blocking pool.
pub trait AudioTranscoder: Send + Sync {
    fn transcode(
        &self,
        input: &Path,
        extension_hint: Option<&str>,
        output: &Path,
        target_sample_rate: u32,
    ) -> Result<TranscodeStats, TranscodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeStats {
    pub source_sample_rate: u32,
    pub source_channels: usize,
    pub frames: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("audio decoding failed: {0}")]
    DecodingFailed(String),
    #[error("resampling failed: {0}")]
    ResamplingFailed(String),
    #[error("encoding failed: {0}")]
    EncodingFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
