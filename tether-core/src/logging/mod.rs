//! Logging subsystem for Tether
//!
//! Thin wrapper over `tracing-subscriber`. The `RUST_LOG` environment
//! variable takes precedence over the configured level.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Errors raised while setting up the logging subsystem
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber was already installed
    #[error("Logging initialization failed: {0}")]
    InitializationFailed(String),
}

/// Initialize logging with default settings
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize the logging subsystem from a [`LoggingConfig`]
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let fmt_layer = fmt::layer().with_target(config.with_target);

    if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_init_reports_error() {
        // A subscriber is installed by the first call (or an earlier test);
        // the second call must fail cleanly rather than panic.
        let _ = init_logging();
        let second = init_logging();
        assert!(matches!(second, Err(LoggingError::InitializationFailed(_))));
    }
}
