//! Configuration for the dataset tools.

use crate::pipeline::BalanceMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the cache file inside the data directory.
pub const CACHE_FILE_NAME: &str = "db.json";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint of the remote record store
    pub database_url: String,

    /// Credentials file for the store
    pub credentials_path: Option<PathBuf>,

    /// Timeout for the full-tree download
    #[serde(with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Directory holding the cached record tree
    pub data_path: PathBuf,

    /// Explicit cache file, overriding `data_path/db.json`
    pub cache_file: Option<PathBuf>,

    /// Directory for exported datasets
    pub export_path: PathBuf,

    /// Default balancing strategy for stress datasets
    pub balance: BalanceMode,

    /// Fraction of rows held out for testing
    pub test_fraction: f64,

    /// Split re-draws allowed before giving up
    pub max_split_attempts: usize,

    /// Multiplier applied after the energy transform
    pub energy_scale: f64,

    /// Seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stress-sensor-data");

        Self {
            database_url: "https://at-stress-sensor.firebaseio.com/".to_string(),
            credentials_path: None,
            fetch_timeout: Duration::from_secs(30),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
            cache_file: None,
            balance: BalanceMode::BeforeSplit,
            test_fraction: 0.33,
            max_split_attempts: 100,
            energy_scale: 30.0,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stress-sensor-data")
            .join("config.json")
    }

    /// Location of the cached record tree.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.data_path.join(CACHE_FILE_NAME))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "test_fraction must lie strictly between 0 and 1, got {}",
                self.test_fraction
            )));
        }
        if self.max_split_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_split_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
