use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::application::ports::WeightFetcher;
use crate::application::services::LoadError;
use crate::domain::WeightSource;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Downloads the weights artifact once. Presence is an existence check only.
pub struct HttpWeightFetcher {
    client: reqwest::Client,
}

impl HttpWeightFetcher {
    pub fn new() -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| LoadError::WeightAcquisition(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, LoadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::WeightAcquisition(format!("request: {}", e)))?;

        if !response.status().is_success() {
            return Err(LoadError::WeightAcquisition(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LoadError::WeightAcquisition(format!("create {}: {}", dest.display(), e)))?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        let mut next_report = 10u64;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| LoadError::WeightAcquisition(format!("body: {}", e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LoadError::WeightAcquisition(format!("write: {}", e)))?;
            written += chunk.len() as u64;

            if let Some(total) = total.filter(|t| *t > 0) {
                let percent = written * 100 / total;
                if percent >= next_report {
                    tracing::info!(percent, downloaded_bytes = written, total_bytes = total, "Downloading model weights");
                    next_report = (percent / 10 + 1) * 10;
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| LoadError::WeightAcquisition(format!("flush: {}", e)))?;

        Ok(written)
    }
}

#[async_trait]
impl WeightFetcher for HttpWeightFetcher {
    #[tracing::instrument(skip(self, source), fields(path = %source.local_path().display()))]
    async fn ensure_present(&self, source: &WeightSource) -> Result<PathBuf, LoadError> {
        let dest = source.local_path().to_path_buf();
        if source.is_present() {
            tracing::debug!("Model weights already present");
            return Ok(dest);
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LoadError::WeightAcquisition(format!("create dir: {}", e)))?;
        }

        let partial = partial_path(&dest);
        tracing::info!(url = %source.url(), "Downloading model weights");

        match self.download(source.url(), &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, &dest).await.map_err(|e| {
                    LoadError::WeightAcquisition(format!("finalize download: {}", e))
                })?;
                tracing::info!(bytes, "Model weights downloaded");
                Ok(dest)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
