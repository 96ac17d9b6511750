use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::DeviceProbe;

/// Detects CUDA devices by asking `nvidia-smi` to list GPUs.
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    program: String,
    args: Vec<String>,
}

impl NvidiaSmiProbe {
    pub fn new() -> Self {
        Self::with_command("nvidia-smi", vec!["-L".to_string()])
    }

    /// Runs `program` instead; the host has CUDA if it succeeds and lists a `GPU`.
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceProbe for NvidiaSmiProbe {
    async fn cuda_available(&self) -> bool {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(o) => o.status.success() && String::from_utf8_lossy(&o.stdout).contains("GPU"),
            Err(e) => {
                tracing::debug!(program = %self.program, error = %e, "GPU probe unavailable");
                false
            }
        }
    }
}

/// Fixed answer, for hosts where probing is unwanted.
#[derive(Debug, Clone, Copy)]
pub struct StaticDeviceProbe(pub bool);

#[async_trait]
impl DeviceProbe for StaticDeviceProbe {
    async fn cuda_available(&self) -> bool {
        self.0
    }
}
