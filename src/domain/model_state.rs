use std::fmt;
use std::str::FromStr;

use super::compute_device::ComputeDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Unloaded => "UNLOADED",
            ModelState::Loading => "LOADING",
            ModelState::Ready => "READY",
            ModelState::Failed => "FAILED",
        }
    }
}

impl FromStr for ModelState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNLOADED" => Ok(ModelState::Unloaded),
            "LOADING" => Ok(ModelState::Loading),
            "READY" => Ok(ModelState::Ready),
            "FAILED" => Ok(ModelState::Failed),
            _ => Err(format!("Invalid model state: {}", s)),
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the model slot as seen by readers outside the inference gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStatus {
    pub state: ModelState,
    pub device: Option<ComputeDevice>,
}

impl ModelStatus {
    pub fn unloaded() -> Self {
        Self {
            state: ModelState::Unloaded,
            device: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ModelState::Ready
    }
}

impl Default for ModelStatus {
    fn default() -> Self {
        Self::unloaded()
    }
}
