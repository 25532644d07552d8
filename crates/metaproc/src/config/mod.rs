//! Process configuration.
//!
//! A [`Config`] is assembled once at startup from the environment preset,
//! an optional TOML file and `METAPROC_*` variables, validated, and then
//! shared read-only as `Arc<Config>`.

mod defaults;
mod error;
mod loader;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use defaults::config_for;
pub use error::ConfigError;
pub use loader::{ENV_PREFIX, load};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Staging,
    Development,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
            Environment::Test => "test",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub environment: Environment,
    /// Directory of the sled database holding entities and metadata.
    pub store_path: PathBuf,

    pub ipfs_gateways: Vec<String>,
    pub ipfs_fallback_gateway: String,

    pub processing_workers: usize,
    /// Whole gateway rounds per download, including the first.
    pub download_retries: u32,
    pub grid_size: f64,
    /// Allowed polygon overage in basis points of the declared count.
    pub polygon_count_error: u32,

    pub http_timeout_seconds: u64,
    pub http_max_connections: usize,
    pub max_metadata_file_size: u64,
    pub max_artifact_file_size: u64,

    pub startup_wait_seconds: u64,
    pub store_retry_seconds: u64,
    pub poll_interval_millis: u64,

    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        config_for(Environment::default())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ipfs_gateways.iter().all(|g| g.trim().is_empty()) {
            return Err(ConfigError::Invalid("ipfs_gateways must not be empty".into()));
        }
        if self.ipfs_fallback_gateway.trim().is_empty() {
            return Err(ConfigError::Invalid("ipfs_fallback_gateway must be set".into()));
        }
        if self.processing_workers == 0 {
            return Err(ConfigError::Invalid("processing_workers must be at least 1".into()));
        }
        if self.download_retries == 0 {
            return Err(ConfigError::Invalid("download_retries must be at least 1".into()));
        }
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid_size must be a positive number, got {}",
                self.grid_size
            )));
        }
        if self.http_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("http_timeout_seconds must be at least 1".into()));
        }
        if self.http_max_connections == 0 {
            return Err(ConfigError::Invalid("http_max_connections must be at least 1".into()));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn startup_wait(&self) -> Duration {
        Duration::from_secs(self.startup_wait_seconds)
    }

    pub fn store_retry(&self) -> Duration {
        Duration::from_secs(self.store_retry_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    /// Submissions the orchestrator keeps queued ahead of the workers.
    pub fn backlog_limit(&self) -> usize {
        self.processing_workers.saturating_mul(2)
    }
}
