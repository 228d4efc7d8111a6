//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value from the environment or a file failed to parse
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The config file could not be read
    #[error("Failed to read config file: {0}")]
    FileReadError(String),

    /// The config file could not be written
    #[error("Failed to write config file: {0}")]
    FileWriteError(String),

    /// The config file is not valid TOML
    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    /// Serializing the config to TOML failed
    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    /// A semantic validation check failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}
