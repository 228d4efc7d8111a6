//! Peer identity payloads
//!
//! The self-described metadata a peer presents when a channel opens. Only
//! `id`, `name`, `kind` and `capabilities` are meaningful to the core;
//! every other field rides along opaquely so collaborating layers can
//! extend the payload without touching the registry.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::device_id::DeviceId;
use super::errors::IdentityError;

/// Broad device categories used for presentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceKind {
    Phone,
    Tablet,
    Desktop,
    Tv,
    #[default]
    Unknown,
}

impl DeviceKind {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Phone => "phone",
            DeviceKind::Tablet => "tablet",
            DeviceKind::Desktop => "desktop",
            DeviceKind::Tv => "tv",
            DeviceKind::Unknown => "unknown",
        }
    }
}

impl FromStr for DeviceKind {
    type Err = std::convert::Infallible;

    // Unrecognized kinds map to Unknown; a peer reporting a kind this
    // build does not know about is not an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "phone" => DeviceKind::Phone,
            "tablet" => DeviceKind::Tablet,
            "desktop" => DeviceKind::Desktop,
            "tv" => DeviceKind::Tv,
            _ => DeviceKind::Unknown,
        })
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(DeviceKind::Unknown))
    }
}

/// Identity metadata presented by a peer on a discovered channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityPayload {
    /// Claimed device id; empty/absent is a protocol violation
    #[serde(default)]
    pub id: String,

    /// Human-readable device name
    #[serde(default)]
    pub name: Option<String>,

    /// Device category
    #[serde(default)]
    pub kind: DeviceKind,

    /// Plugin identifiers the peer advertises (opaque to the core)
    #[serde(default)]
    pub capabilities: BTreeSet<String>,

    /// Unspecified fields, passed through unmodified
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IdentityPayload {
    /// Parse a payload from raw JSON
    pub fn from_value(value: serde_json::Value) -> Result<Self, IdentityError> {
        serde_json::from_value(value)
            .map_err(|e| IdentityError::InvalidPayload(e.to_string()))
    }

    /// Validate and return the claimed device id
    pub fn device_id(&self) -> Result<DeviceId, IdentityError> {
        DeviceId::new(self.id.clone())
    }
}
