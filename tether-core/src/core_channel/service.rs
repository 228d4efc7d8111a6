//! Channel service capability interface
//!
//! A channel service is one pluggable transport backend: it discovers and
//! announces peers and produces opened [`Channel`]s. Backends are
//! registered into a [`super::ChannelServiceRegistry`]; no dynamic code
//! loading is involved, only polymorphism over this trait.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::channel::{Channel, ChannelId};
use super::errors::ChannelResult;

/// Events a channel service delivers to its registry
///
/// Events from a single service are delivered in the order the service
/// produced them.
#[derive(Debug)]
pub enum ServiceEvent {
    /// A peer was discovered: an opened transport plus the identity the
    /// peer presented
    Discovered(Channel),

    /// A previously-discovered channel was closed by the remote side or
    /// the underlying transport
    ChannelClosed(ChannelId),
}

/// One pluggable transport backend
#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Transport identifier, unique within a registry
    fn name(&self) -> &str;

    /// Locator schemes this backend can route (e.g. `lan`, `bluetooth`)
    fn schemes(&self) -> Vec<String>;

    /// Begin discovery/listening, delivering events on `events`
    ///
    /// Called at most once between `stop`s; the sender is dropped on stop.
    async fn start(&self, events: mpsc::Sender<ServiceEvent>) -> ChannelResult<()>;

    /// Stop discovery and release transport resources
    async fn stop(&self);

    /// Actively announce/identify, optionally toward one endpoint
    ///
    /// `target` is a full locator (`scheme://address`); `None` means
    /// broadcast. Fire-and-forget: completion does not imply a reply.
    async fn identify(&self, target: Option<&str>) -> ChannelResult<()>;
}

/// Extract the scheme of a locator such as `lan://192.168.0.4`
pub fn locator_scheme(locator: &str) -> Option<&str> {
    locator
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|s| !s.is_empty())
}
