use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{Captioner, CaptionerError, CaptionerLoader, ModelSpec};
use crate::application::services::LoadError;
use crate::domain::{ComputeDevice, DecodingParams};

/// Captioning served by a remote inference endpoint.
pub struct RemoteCaptionerLoader {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCaptionerLoader {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RemoteHealth {
    device: Option<String>,
}

#[derive(Deserialize)]
struct RemoteCaptionResponse {
    captions: Option<serde_json::Value>,
}

#[async_trait]
impl CaptionerLoader for RemoteCaptionerLoader {
    fn requires_local_weights(&self) -> bool {
        false
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Captioner>, LoadError> {
        let url = format!("{}/health", self.base_url);
        tracing::info!(url = %url, "Probing remote captioning endpoint");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::ModelConstruction(format!("health request: {}", e)))?;

        if !response.status().is_success() {
            return Err(LoadError::ModelConstruction(format!(
                "remote endpoint unhealthy: status {}",
                response.status()
            )));
        }

        let device = match response.json::<RemoteHealth>().await {
            Ok(RemoteHealth {
                device: Some(device),
            }) if device == "cuda" => ComputeDevice::Cuda,
            Ok(RemoteHealth {
                device: Some(_),
            }) => ComputeDevice::Cpu,
            _ => spec.device,
        };

        Ok(Box::new(RemoteCaptioner {
            client: self.client.clone(),
            endpoint: format!("{}/caption", self.base_url),
            device,
        }))
    }
}

pub struct RemoteCaptioner {
    client: reqwest::Client,
    endpoint: String,
    device: ComputeDevice,
}

#[async_trait]
impl Captioner for RemoteCaptioner {
    async fn generate(
        &mut self,
        waveform: &Path,
        params: &DecodingParams,
    ) -> Result<serde_json::Value, CaptionerError> {
        let audio = tokio::fs::read(waveform)
            .await
            .map_err(|e| CaptionerError::Inference(format!("read waveform: {}", e)))?;

        let file_part = multipart::Part::bytes(audio)
            .file_name("waveform.wav")
            .mime_str("audio/wav")
            .map_err(|e| CaptionerError::Inference(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .text("beam_size", params.beam_width.to_string())
            .text("entry_length", params.max_length.to_string())
            .text("temperature", params.temperature.to_string())
            .text("resample", params.resample.to_string())
            .part("file", file_part);

        tracing::debug!(endpoint = %self.endpoint, "Sending waveform to remote captioner");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CaptionerError::Inference(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CaptionerError::Inference(format!(
                "status {}: {}",
                status, body
            )));
        }

        let result: RemoteCaptionResponse = response
            .json()
            .await
            .map_err(|e| CaptionerError::Inference(format!("parse response: {}", e)))?;

        Ok(result.captions.unwrap_or(serde_json::Value::Null))
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }

    async fn release(&mut self) {
        tracing::debug!(endpoint = %self.endpoint, "Remote captioner released");
    }
}
