//! tether-core
//!
//! The trust and connectivity core of the tether sync platform: local and
//! remote identity management, pluggable channel-discovery transports, and
//! the device registry with its pairing-aware retention policy.

pub mod config;
pub mod core_channel;
pub mod core_device;
pub mod core_identity;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use core_channel::{ChannelService, LoopbackChannelService, ServiceEvent};
pub use core_device::{DeviceEvent, DeviceManager, DeviceSnapshot, PairingState, RegistryExporter};
pub use core_identity::{DeviceId, IdentityPayload};
pub use logging::init_logging;
