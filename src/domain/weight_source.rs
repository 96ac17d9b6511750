use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_WEIGHTS_URL: &str = "https://github.com/MadeByKit/sound-classifier-next/releases/download/v1.0.0/clapcap_weights_2023.pth";
pub const DEFAULT_WEIGHTS_PATH: &str = "clapcap_weights_2023.pth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightSource {
    url: String,
    local_path: PathBuf,
}

impl WeightSource {
    pub fn new(url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            local_path: local_path.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn is_present(&self) -> bool {
        self.local_path.is_file()
    }
}

impl Default for WeightSource {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHTS_URL, DEFAULT_WEIGHTS_PATH)
    }
}

impl fmt::Display for WeightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local_path.display())
    }
}
