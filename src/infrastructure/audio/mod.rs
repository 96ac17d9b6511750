pub mod audio_decoder;
mod resampler;
mod symphonia_transcoder;
mod wav_encoder;

pub use resampler::resample;
pub use symphonia_transcoder::SymphoniaTranscoder;
pub use wav_encoder::write_mono_wav;
