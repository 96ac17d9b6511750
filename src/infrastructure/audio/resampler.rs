use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::application::ports::TranscodeError;

const CHUNK_SIZE: usize = 1024;

pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, TranscodeError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(TranscodeError::ResamplingFailed(format!(
            "invalid sample rates {} -> {}",
            from_rate, to_rate
        )));
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|e| TranscodeError::ResamplingFailed(format!("resampler init: {}", e)))?;

    let delay = resampler.output_delay();
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);

    // One extra chunk of silence flushes the filter tail.
    let padded_len = samples.len() + CHUNK_SIZE;
    let mut offset = 0;
    while output.len() < expected_len + delay && offset < padded_len {
        let mut input = vec![0.0f32; CHUNK_SIZE];
        let available = samples.len().saturating_sub(offset).min(CHUNK_SIZE);
        if available > 0 {
            input[..available].copy_from_slice(&samples[offset..offset + available]);
        }
        offset += CHUNK_SIZE;

        let result = resampler
            .process(&[input], None)
            .map_err(|e| TranscodeError::ResamplingFailed(format!("resample: {}", e)))?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    let end = (delay + expected_len).min(output.len());
    let start = delay.min(end);
    Ok(output[start..end].to_vec())
}
