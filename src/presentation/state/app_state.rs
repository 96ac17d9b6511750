use std::sync::Arc;

use crate::application::services::{CaptionService, ModelHandle};

#[derive(Clone)]
pub struct AppState {
    pub caption_service: CaptionService,
    pub accelerator_available: bool,
}

impl AppState {
    pub fn new(caption_service: CaptionService, accelerator_available: bool) -> Self {
        Self {
            caption_service,
            accelerator_available,
        }
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        self.caption_service.model()
    }
}
