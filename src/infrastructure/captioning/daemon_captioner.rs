use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::application::ports::{Captioner, CaptionerError, CaptionerLoader, ModelSpec};
use crate::application::services::LoadError;
use crate::domain::{ComputeDevice, DecodingParams};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Spawns a persistent model process speaking line-delimited JSON on stdio.
pub struct ClapDaemonLoader {
    program: String,
    args: Vec<String>,
    ready_timeout: Duration,
}

impl ClapDaemonLoader {
    pub fn new(program: impl Into<String>, args: Vec<String>, ready_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            ready_timeout,
        }
    }

    fn command(&self, spec: &ModelSpec) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--weights")
            .arg(&spec.weights_path)
            .arg("--device")
            .arg(spec.device.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if !spec.device.is_accelerator() {
            let threads = spec.cpu_threads.max(1).to_string();
            command
                .arg("--threads")
                .arg(&threads)
                .env("OMP_NUM_THREADS", &threads)
                .env("MKL_NUM_THREADS", &threads);
        }

        command
    }
}

#[async_trait]
impl CaptionerLoader for ClapDaemonLoader {
    #[tracing::instrument(skip(self, spec), fields(program = %self.program, device = %spec.device))]
    async fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Captioner>, LoadError> {
        let mut child = self
            .command(spec)
            .spawn()
            .map_err(|e| LoadError::ModelConstruction(format!("spawn {}: {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LoadError::ModelConstruction("daemon stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LoadError::ModelConstruction("daemon stdout unavailable".to_string()))?;

        tracing::info!(pid = ?child.id(), "Captioning daemon spawned, waiting for readiness");

        let mut captioner = ClapDaemonCaptioner {
            child: Some(child),
            stdin,
            stdout: BufReader::new(stdout).lines(),
            device: spec.device,
            weights: spec.weights_path.clone(),
            next_id: 0,
        };

        let ready = match tokio::time::timeout(self.ready_timeout, captioner.read_reply(None)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                captioner.release().await;
                return Err(LoadError::ModelConstruction(e.to_string()));
            }
            Err(_) => {
                captioner.release().await;
                return Err(LoadError::ModelConstruction(format!(
                    "daemon not ready after {}s",
                    self.ready_timeout.as_secs()
                )));
            }
        };

        if let Some(error) = ready.error {
            captioner.release().await;
            return Err(LoadError::ModelConstruction(error));
        }
        if ready.status.as_deref() != Some("ready") {
            captioner.release().await;
            return Err(LoadError::ModelConstruction(format!(
                "unexpected daemon status: {:?}",
                ready.status
            )));
        }

        if let Some(reported) = ready.device.as_deref() {
            if reported != spec.device.as_str() {
                tracing::warn!(requested = %spec.device, reported, "Daemon reported a different device");
                captioner.device = if reported == "cuda" {
                    ComputeDevice::Cuda
                } else {
                    ComputeDevice::Cpu
                };
            }
        }

        Ok(Box::new(captioner))
    }
}

pub struct ClapDaemonCaptioner {
    child: Option<Child>,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    device: ComputeDevice,
    weights: PathBuf,
    next_id: u64,
}

#[derive(Serialize)]
struct DaemonRequest<'a> {
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resample: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    beam_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl DaemonRequest<'_> {
    fn shutdown() -> Self {
        Self {
            command: "shutdown",
            id: None,
            audio_path: None,
            resample: None,
            beam_size: None,
            entry_length: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DaemonReply {
    id: Option<u64>,
    status: Option<String>,
    device: Option<String>,
    captions: Option<serde_json::Value>,
    error: Option<String>,
}

impl ClapDaemonCaptioner {
    async fn send(&mut self, request: &DaemonRequest<'_>) -> Result<(), CaptionerError> {
        let mut line = serde_json::to_vec(request)
            .map_err(|e| CaptionerError::Inference(format!("serialize request: {}", e)))?;
        line.push(b'\n');

        self.stdin
            .write_all(&line)
            .await
            .map_err(|e| CaptionerError::Terminated(format!("write to daemon: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| CaptionerError::Terminated(format!("flush daemon stdin: {}", e)))
    }

    /// Next protocol reply. Lines that are not JSON objects are daemon chatter
    /// and skipped; a reply echoing an id other than `expected` belongs to an
    /// earlier request and is discarded.
    async fn read_reply(&mut self, expected: Option<u64>) -> Result<DaemonReply, CaptionerError> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| CaptionerError::Terminated(format!("read from daemon: {}", e)))?
                .ok_or_else(|| CaptionerError::Terminated("daemon closed its output".to_string()))?;

            let trimmed = line.trim();
            if !trimmed.starts_with('{') {
                if !trimmed.is_empty() {
                    tracing::debug!(line = trimmed, "Daemon output");
                }
                continue;
            }

            let reply: DaemonReply = match serde_json::from_str(trimmed) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(error = %e, line = trimmed, "Skipping unparseable daemon output");
                    continue;
                }
            };

            match (expected, reply.id) {
                (Some(want), Some(got)) if want != got => {
                    tracing::warn!(expected = want, received = got, "Discarding stale daemon reply");
                }
                _ => return Ok(reply),
            }
        }
    }
}

#[async_trait]
impl Captioner for ClapDaemonCaptioner {
    async fn generate(
        &mut self,
        waveform: &Path,
        params: &DecodingParams,
    ) -> Result<serde_json::Value, CaptionerError> {
        self.next_id += 1;
        let id = self.next_id;

        let request = DaemonRequest {
            command: "caption",
            id: Some(id),
            audio_path: Some(waveform),
            resample: Some(params.resample),
            beam_size: Some(params.beam_width),
            entry_length: Some(params.max_length),
            temperature: Some(params.temperature),
        };

        self.send(&request).await?;
        let reply = self.read_reply(Some(id)).await?;

        if let Some(error) = reply.error {
            return Err(CaptionerError::Inference(error));
        }

        Ok(reply.captions.unwrap_or(serde_json::Value::Null))
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }

    async fn release(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        let _ = self.send(&DaemonRequest::shutdown()).await;

        let status = match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!("Daemon ignored shutdown, killing");
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "Failed to signal daemon");
                }
                child.wait().await
            }
        };

        match status {
            Ok(status) => tracing::info!(
                %status,
                weights = %self.weights.display(),
                "Captioning daemon stopped"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to reap captioning daemon"),
        }
    }
}
