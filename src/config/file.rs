//! Optional TOML configuration file
//!
//! Every key is optional; anything left out keeps its built-in default.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8000
//! cors_origins = ["https://app.example.edu"]
//! sweep_interval_secs = 900
//!
//! [timeouts]
//! validate_secs = 5
//! request_secs = 30
//! file_secs = 120
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Config, Timeouts};

/// Root of the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Allowed browser origins
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// Seconds between expired-session sweeps
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,

    #[serde(default)]
    pub timeouts: TimeoutsFile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutsFile {
    #[serde(default)]
    pub validate_secs: Option<u64>,

    #[serde(default)]
    pub request_secs: Option<u64>,

    #[serde(default)]
    pub file_secs: Option<u64>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)?;
        if let Some(origins) = &config.cors_origins {
            if origins.iter().any(|o| o.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "cors_origins must not contain empty entries".into(),
                ));
            }
        }
        Ok(config)
    }

    /// Overlay the file's values on the defaults
    pub fn into_config(self) -> Config {
        let defaults = Config::default();
        let timeouts = Timeouts {
            validate_secs: self
                .timeouts
                .validate_secs
                .unwrap_or(defaults.timeouts.validate_secs),
            request_secs: self
                .timeouts
                .request_secs
                .unwrap_or(defaults.timeouts.request_secs),
            file_secs: self.timeouts.file_secs.unwrap_or(defaults.timeouts.file_secs),
        };

        Config {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            cors_origins: self.cors_origins.unwrap_or(defaults.cors_origins),
            sweep_interval_secs: self
                .sweep_interval_secs
                .unwrap_or(defaults.sweep_interval_secs),
            timeouts,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
