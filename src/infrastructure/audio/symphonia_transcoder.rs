use std::path::Path;

use crate::application::ports::{AudioTranscoder, TranscodeError, TranscodeStats};

use super::audio_decoder::decode_file_to_mono;
use super::resampler::resample;
use super::wav_encoder::write_mono_wav;

/// symphonia decode, rubato resample, hound encode.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaTranscoder;

impl SymphoniaTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioTranscoder for SymphoniaTranscoder {
    fn transcode(
        &self,
        input: &Path,
        extension_hint: Option<&str>,
        output: &Path,
        target_sample_rate: u32,
    ) -> Result<TranscodeStats, TranscodeError> {
        let decoded = decode_file_to_mono(input, extension_hint)?;
        let samples = resample(&decoded.samples, decoded.sample_rate, target_sample_rate)?;

        write_mono_wav(output, &samples, target_sample_rate)?;

        Ok(TranscodeStats {
            source_sample_rate: decoded.sample_rate,
            source_channels: decoded.channels,
            frames: samples.len() as u64,
        })
    }
}
