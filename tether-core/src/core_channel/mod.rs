//! Channel services and transports
//!
//! Multiplexing of independently-enabled transport backends:
//! - [`Channel`]: one live connection to a peer, device-owned
//! - [`ChannelService`]: the pluggable backend capability interface
//! - [`ChannelServiceRegistry`]: enablement, fan-in and identify routing
//! - [`LoopbackChannelService`]: in-memory backend for demos and tests

mod channel;
mod errors;
mod loopback;
mod registry;
mod service;

pub use channel::{Channel, ChannelId, ChannelTransport};
pub use errors::{ChannelError, ChannelResult};
pub use loopback::{LoopbackChannelService, LoopbackHandle, LOOPBACK_SERVICE};
pub use registry::{ChannelServiceRegistry, ServiceDescriptor};
pub use service::{locator_scheme, ChannelService, ServiceEvent};
