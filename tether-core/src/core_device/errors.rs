//! Error types for core_device

use thiserror::Error;

use crate::config::ConfigError;
use crate::core_channel::ChannelError;
use crate::core_identity::IdentityError;

/// Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors surfaced by the device manager
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Configuration rejected at construction
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Credential or record store failure
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Transport backend failure
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// No device with this id in the registry
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The operation needs a live channel
    #[error("Device not connected: {0}")]
    NotConnected(String),

    /// Async runtime plumbing failed (should not happen)
    #[error("Runtime error: {0}")]
    Runtime(String),
}
