//! Error types for core_identity

use thiserror::Error;

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors raised by identity handling and persistence
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The peer presented an id the registry cannot accept
    #[error("Invalid device id: {0}")]
    InvalidId(String),

    /// The identity payload is structurally unusable
    #[error("Invalid identity payload: {0}")]
    InvalidPayload(String),

    /// No persisted snapshot exists for the requested id
    #[error("No identity record for device: {0}")]
    NotFound(String),

    /// The configuration root or a record could not be read/written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record failed to serialize or deserialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
