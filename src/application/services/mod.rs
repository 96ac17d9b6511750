mod audio_normalizer;
mod caption_service;
mod model_handle;
mod model_lifecycle;

pub use audio_normalizer::{AudioNormalizer, CANONICAL_SAMPLE_RATE, FormatError};
pub use caption_service::{CaptionService, ServiceError};
pub use model_handle::{InferenceError, ModelHandle};
pub use model_lifecycle::{DevicePreference, LoadError, ModelLifecycleManager};
