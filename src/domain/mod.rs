mod audio_asset;
mod caption_result;
mod compute_device;
mod decoding_params;
mod model_state;
mod waveform_asset;
mod weight_source;

pub use audio_asset::AudioAsset;
pub use caption_result::CaptionResult;
pub use compute_device::ComputeDevice;
pub use decoding_params::DecodingParams;
pub use model_state::{ModelState, ModelStatus};
pub use waveform_asset::WaveformAsset;
pub use weight_source::{DEFAULT_WEIGHTS_PATH, DEFAULT_WEIGHTS_URL, WeightSource};
