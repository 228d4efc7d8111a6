//! Configuration management for Tether
//!
//! Environment-based configuration with defaults, TOML file support and
//! validation. The configuration root (`data_dir`) is where the local
//! key pair and per-device identity snapshots live.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration root: key pair + device identity snapshots
    pub data_dir: PathBuf,

    /// Transport backend configuration
    pub transports: TransportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Transport backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-backend enabled flags, keyed by transport name.
    ///
    /// Backends not listed here default to enabled.
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
}

impl TransportConfig {
    /// Whether the named backend is enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.get(name).copied().unwrap_or(true)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            transports: TransportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: TETHER_<SECTION>_<KEY>
    /// Example: TETHER_DATA_DIR=/var/lib/tether
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(data_dir) = env::var("TETHER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        // Comma-separated list of disabled transport backends
        if let Ok(disabled) = env::var("TETHER_TRANSPORTS_DISABLED") {
            for name in disabled.split(',').filter(|s| !s.is_empty()) {
                config.transports.enabled.insert(name.trim().to_string(), false);
            }
        }

        if let Ok(level) = env::var("TETHER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("TETHER_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "data_dir must not be empty".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
