use std::path::PathBuf;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::{CANONICAL_SAMPLE_RATE, DevicePreference};
use crate::domain::{DEFAULT_WEIGHTS_PATH, DEFAULT_WEIGHTS_URL, WeightSource};

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub audio: AudioSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub provider: CaptionerProvider,
    pub weights_url: String,
    pub weights_path: PathBuf,
    pub device: DevicePreference,
    pub cpu_threads: usize,
    pub daemon_command: Vec<String>,
    pub ready_timeout_secs: u64,
    #[serde(default)]
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionerProvider {
    Daemon,
    Remote,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    pub scratch_dir: PathBuf,
    pub sample_rate: u32,
    pub max_concurrent_decodes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Settings {
    /// Defaults, then `appsettings.toml`, then `appsettings.<env>.toml`, then
    /// `APP_`-prefixed environment variables (`APP_SERVER__PORT=8000`).
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        let scratch_dir = std::env::temp_dir().join("audiocap");

        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.max_upload_mb", 25)?
            .set_default("server.cors_allowed_origins", vec!["*"])?
            .set_default("model.provider", "daemon")?
            .set_default("model.weights_url", DEFAULT_WEIGHTS_URL)?
            .set_default("model.weights_path", DEFAULT_WEIGHTS_PATH)?
            .set_default("model.device", "auto")?
            .set_default("model.cpu_threads", 1)?
            .set_default(
                "model.daemon_command",
                vec!["python3", "scripts/clapcap_daemon.py"],
            )?
            .set_default("model.ready_timeout_secs", 300)?
            .set_default("audio.scratch_dir", scratch_dir.to_string_lossy().to_string())?
            .set_default("audio.sample_rate", CANONICAL_SAMPLE_RATE)?
            .set_default("audio.max_concurrent_decodes", 2)?
            .set_default("logging.level", "info")?
            .set_default("logging.enable_json", false)?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name(&environment.settings_file()).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("server.cors_allowed_origins")
                    .with_list_parse_key("model.daemon_command")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl ModelSettings {
    pub fn weight_source(&self) -> WeightSource {
        WeightSource::new(self.weights_url.clone(), self.weights_path.clone())
    }
}

impl ServerSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_mb: 25,
            request_timeout_secs: None,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}
