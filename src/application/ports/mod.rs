mod audio_transcoder;
mod captioner;
mod device_probe;
mod weight_fetcher;

pub use audio_transcoder::{AudioTranscoder, TranscodeError, TranscodeStats};
pub use captioner::{Captioner, CaptionerError, CaptionerLoader, ModelSpec};
pub use device_probe::DeviceProbe;
pub use weight_fetcher::WeightFetcher;
