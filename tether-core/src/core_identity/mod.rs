//! Identity management
//!
//! Peer identity resolution and persistence:
//! - [`DeviceId`]: stable opaque identifier derived from a certificate
//! - [`IdentityPayload`]: the metadata a peer presents on connection
//! - [`IdentityStore`]: persisted per-device snapshots with pairing flags
//! - [`LocalIdentity`]: the local key pair and its derived id

mod device_id;
mod errors;
mod local;
mod payload;
mod store;

pub use device_id::DeviceId;
pub use errors::{IdentityError, IdentityResult};
pub use local::LocalIdentity;
pub use payload::{DeviceKind, IdentityPayload};
pub use store::{IdentityRecord, IdentityStore};
