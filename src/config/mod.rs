//! Application configuration

pub mod file;

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use file::{ConfigError, FileConfig};

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "MOODLE_GATEWAY_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub sweep_interval_secs: u64,
    pub timeouts: Timeouts,
}

/// Per-call timeouts for requests to Moodle instances
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeouts {
    /// Instance validation probes
    pub validate_secs: u64,
    /// Token issuance and web-service calls
    pub request_secs: u64,
    /// File downloads
    pub file_secs: u64,
}

impl Timeouts {
    pub fn validate(&self) -> Duration {
        Duration::from_secs(self.validate_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn file(&self) -> Duration {
        Duration::from_secs(self.file_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            validate_secs: 10,
            request_secs: 30,
            file_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            cors_origins: vec!["http://localhost:5173".into()],
            sweep_interval_secs: 3600,
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    /// Build the configuration from defaults, an optional TOML file named by
    /// `MOODLE_GATEWAY_CONFIG`, and environment overrides, in that order.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load defaults overlaid with a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(FileConfig::from_file(path)?.into_config())
    }

    /// Apply overrides from a key lookup. Unparseable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("BACKEND_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("BACKEND_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if !origins.is_empty() {
                self.cors_origins = origins;
            }
        }
        if let Some(secs) = lookup("SESSION_SWEEP_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.sweep_interval_secs = secs;
        }
        if let Some(secs) = lookup("MOODLE_VALIDATE_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeouts.validate_secs = secs;
        }
        if let Some(secs) = lookup("MOODLE_REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeouts.request_secs = secs;
        }
        if let Some(secs) = lookup("MOODLE_FILE_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeouts.file_secs = secs;
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
