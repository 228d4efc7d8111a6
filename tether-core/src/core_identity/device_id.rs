//! Device id newtype
//!
//! A device id is the stable, opaque identifier derived from a peer's
//! certificate. The core only compares ids and uses them as storage keys;
//! it never inspects their structure.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::IdentityError;

/// Stable opaque identifier for one remote device
///
/// Ids name on-disk directories, so path separators and relative path
/// components are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a raw id string
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();

        if id.is_empty() {
            return Err(IdentityError::InvalidId("empty id".to_string()));
        }
        if id == "." || id == ".." {
            return Err(IdentityError::InvalidId(id));
        }
        if id.contains('/') || id.contains('\\') || id.contains('\0') {
            return Err(IdentityError::InvalidId(id));
        }

        Ok(DeviceId(id))
    }

    /// The raw id string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_ids() {
        let id = DeviceId::new("test-device").unwrap();
        assert_eq!(id.as_str(), "test-device");
        assert_eq!(id.to_string(), "test-device");
    }

    #[test]
    fn test_rejects_empty_id() {
        assert!(DeviceId::new("").is_err());
    }

    #[test]
    fn test_rejects_path_components() {
        assert!(DeviceId::new("..").is_err());
        assert!(DeviceId::new(".").is_err());
        assert!(DeviceId::new("a/b").is_err());
        assert!(DeviceId::new("a\\b").is_err());
        assert!(DeviceId::new("../escape").is_err());
    }

    #[test]
    fn test_serde_rejects_invalid_id() {
        let ok: Result<DeviceId, _> = serde_json::from_str("\"phone-1234\"");
        assert!(ok.is_ok());

        let bad: Result<DeviceId, _> = serde_json::from_str("\"../escape\"");
        assert!(bad.is_err());
    }
}
