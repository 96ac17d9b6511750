use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::CaptionerLoader;
use crate::application::services::LoadError;
use crate::presentation::config::{CaptionerProvider, ModelSettings, ScaffoldConfig};

use super::daemon_captioner::ClapDaemonLoader;
use super::mock_captioner::{MOCK_CAPTION, MockCaptionerLoader};
use super::remote_captioner::RemoteCaptionerLoader;

pub struct CaptionerFactory;

impl CaptionerFactory {
    pub fn create(
        settings: &ModelSettings,
        scaffold: &ScaffoldConfig,
    ) -> Result<Arc<dyn CaptionerLoader>, LoadError> {
        let provider = if scaffold.enabled {
            CaptionerProvider::Mock
        } else {
            settings.provider
        };

        tracing::info!(provider = ?provider, "Selecting captioner");

        match provider {
            CaptionerProvider::Daemon => {
                let (program, args) = settings.daemon_command.split_first().ok_or_else(|| {
                    LoadError::ModelConstruction("daemon command is empty".to_string())
                })?;
                Ok(Arc::new(ClapDaemonLoader::new(
                    program.clone(),
                    args.to_vec(),
                    Duration::from_secs(settings.ready_timeout_secs),
                )))
            }
            CaptionerProvider::Remote => {
                let url = settings.remote_url.as_deref().ok_or_else(|| {
                    LoadError::ModelConstruction(
                        "remote_url required for the remote captioner".to_string(),
                    )
                })?;
                Ok(Arc::new(RemoteCaptionerLoader::new(url)))
            }
            CaptionerProvider::Mock => Ok(Arc::new(MockCaptionerLoader::new(
                MOCK_CAPTION,
                Duration::from_millis(scaffold.mock_response_delay_ms),
            ))),
        }
    }
}
