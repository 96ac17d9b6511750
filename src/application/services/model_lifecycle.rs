use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::application::ports::{CaptionerLoader, DeviceProbe, ModelSpec, WeightFetcher};
use crate::domain::{ComputeDevice, ModelState};

use super::model_handle::ModelHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    Auto,
    Cpu,
    Cuda,
}

/// Owns every load/unload transition of the shared `ModelHandle`.
pub struct ModelLifecycleManager {
    handle: Arc<ModelHandle>,
    loader: Arc<dyn CaptionerLoader>,
    fetcher: Arc<dyn WeightFetcher>,
    probe: Arc<dyn DeviceProbe>,
    preference: DevicePreference,
    cpu_threads: usize,
    transitions: Mutex<()>,
}

impl ModelLifecycleManager {
    pub fn new(
        handle: Arc<ModelHandle>,
        loader: Arc<dyn CaptionerLoader>,
        fetcher: Arc<dyn WeightFetcher>,
        probe: Arc<dyn DeviceProbe>,
        preference: DevicePreference,
        cpu_threads: usize,
    ) -> Self {
        Self {
            handle,
            loader,
            fetcher,
            probe,
            preference,
            cpu_threads: cpu_threads.max(1),
            transitions: Mutex::new(()),
        }
    }

    pub fn handle(&self) -> Arc<ModelHandle> {
        Arc::clone(&self.handle)
    }

    pub async fn load(&self) -> Result<Arc<ModelHandle>, LoadError> {
        let _transition = self.transitions.lock().await;
        self.release_resident().await;
        self.load_locked().await
    }

    pub async fn unload(&self) {
        let _transition = self.transitions.lock().await;
        self.release_resident().await;
    }

    pub async fn reload(&self) -> Result<Arc<ModelHandle>, LoadError> {
        tracing::info!("Reloading captioning model");
        self.load().await
    }

    async fn load_locked(&self) -> Result<Arc<ModelHandle>, LoadError> {
        self.handle.publish(ModelState::Loading, None);

        match self.construct().await {
            Ok(device) => {
                tracing::info!(
                    device = %device,
                    weights = %self.handle.weights(),
                    "Captioning model loaded"
                );
                Ok(Arc::clone(&self.handle))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load captioning model");
                self.handle.publish(ModelState::Failed, None);
                Err(e)
            }
        }
    }

    async fn construct(&self) -> Result<ComputeDevice, LoadError> {
        let weights = self.handle.weights();

        let weights_path = if self.loader.requires_local_weights() {
            self.fetcher.ensure_present(weights).await?
        } else {
            weights.local_path().to_path_buf()
        };

        let device = self.resolve_device().await?;
        let spec = ModelSpec {
            weights_path,
            device,
            cpu_threads: if device.is_accelerator() {
                0
            } else {
                self.cpu_threads
            },
        };

        tracing::info!(device = %device, cpu_threads = spec.cpu_threads, "Constructing captioning model");
        let captioner = self.loader.load(&spec).await?;
        Ok(self.handle.install(captioner).await)
    }

    async fn resolve_device(&self) -> Result<ComputeDevice, LoadError> {
        let cuda = self.probe.cuda_available().await;
        tracing::info!(cuda_available = cuda, preference = ?self.preference, "Resolving compute device");

        match (self.preference, cuda) {
            (DevicePreference::Cpu, _) | (DevicePreference::Auto, false) => Ok(ComputeDevice::Cpu),
            (DevicePreference::Cuda, true) | (DevicePreference::Auto, true) => Ok(ComputeDevice::Cuda),
            (DevicePreference::Cuda, false) => Err(LoadError::DeviceUnavailable(
                "cuda requested but no accelerator detected".to_string(),
            )),
        }
    }

    async fn release_resident(&self) {
        if let Some(mut captioner) = self.handle.take().await {
            tracing::info!("Releasing captioning model");
            captioner.release().await;
        }
        if self.handle.state() != ModelState::Unloaded {
            self.handle.publish(ModelState::Unloaded, None);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("weight acquisition failed: {0}")]
    WeightAcquisition(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("model construction failed: {0}")]
    ModelConstruction(String),
}
