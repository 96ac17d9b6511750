use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::TranscodeError;

/// Writes mono samples as 16-bit PCM WAV.
pub fn write_mono_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), TranscodeError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .map_err(|e| TranscodeError::EncodingFailed(format!("create: {}", e)))?;

    for &sample in samples {
        let clamped = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .map_err(|e| TranscodeError::EncodingFailed(format!("write: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| TranscodeError::EncodingFailed(format!("finalize: {}", e)))
}
