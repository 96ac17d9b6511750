mod caption;
mod health;
mod root;

pub use caption::{CaptionResponse, ErrorResponse, caption_handler};
pub use health::{HealthResponse, health_handler};
pub use root::{RootResponse, root_handler};
