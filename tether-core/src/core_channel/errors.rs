//! Error types for core_channel

use thiserror::Error;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors raised by transport backends and their registry
#[derive(Error, Debug)]
pub enum ChannelError {
    /// A backend with this name is already registered
    #[error("Channel service already registered: {0}")]
    DuplicateService(String),

    /// No backend with this name is registered
    #[error("Unknown channel service: {0}")]
    UnknownService(String),

    /// The backend failed to bind its resources
    #[error("Channel service failed to start: {0}")]
    StartFailed(String),

    /// The target locator has no scheme
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// No running backend can route the target locator
    #[error("No channel service handles scheme: {0}")]
    UnsupportedTarget(String),

    /// The backend is not running
    #[error("Channel service not running: {0}")]
    NotRunning(String),

    /// The event channel to the registry consumer is gone
    #[error("Discovery event channel closed")]
    EventChannelClosed,
}
