pub mod audio;
pub mod captioning;
pub mod model;
pub mod observability;
