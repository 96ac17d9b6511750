use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::services::LoadError;
use crate::domain::WeightSource;

#[async_trait]
pub trait WeightFetcher: Send + Sync {
    /// Makes sure the artifact exists locally and returns its path.
    async fn ensure_present(&self, source: &WeightSource) -> Result<PathBuf, LoadError>;
}
