//! In-memory loopback backend
//!
//! A [`ChannelService`] with no real transport underneath: peers are
//! announced programmatically through a [`LoopbackHandle`]. The CLI demo
//! and the test suites use it to exercise the full discovery, supersession
//! and detach paths without touching the network.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::channel::{Channel, ChannelId, ChannelTransport};
use super::errors::{ChannelError, ChannelResult};
use super::service::{ChannelService, ServiceEvent};
use crate::core_identity::IdentityPayload;

/// Transport name and locator scheme of the loopback backend
pub const LOOPBACK_SERVICE: &str = "loopback";

#[derive(Debug)]
struct LoopbackTransport;

impl ChannelTransport for LoopbackTransport {
    fn close(&mut self) {}
}

struct LoopbackInner {
    events: Option<mpsc::Sender<ServiceEvent>>,
    /// Identities announced on every identify request
    peers: Vec<serde_json::Value>,
}

/// In-memory channel service
pub struct LoopbackChannelService {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl LoopbackChannelService {
    pub fn new() -> Self {
        LoopbackChannelService {
            inner: Arc::new(Mutex::new(LoopbackInner {
                events: None,
                peers: Vec::new(),
            })),
        }
    }

    /// A handle for announcing peers and closing channels
    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            inner: self.inner.clone(),
        }
    }
}

impl Default for LoopbackChannelService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelService for LoopbackChannelService {
    fn name(&self) -> &str {
        LOOPBACK_SERVICE
    }

    fn schemes(&self) -> Vec<String> {
        vec![LOOPBACK_SERVICE.to_string()]
    }

    async fn start(&self, events: mpsc::Sender<ServiceEvent>) -> ChannelResult<()> {
        let mut inner = self.inner.lock().expect("loopback state poisoned");
        inner.events = Some(events);
        Ok(())
    }

    async fn stop(&self) {
        let mut inner = self.inner.lock().expect("loopback state poisoned");
        inner.events = None;
    }

    async fn identify(&self, _target: Option<&str>) -> ChannelResult<()> {
        // Loopback reaches every registered peer regardless of target
        let (events, peers) = {
            let inner = self.inner.lock().expect("loopback state poisoned");
            match &inner.events {
                Some(tx) => (tx.clone(), inner.peers.clone()),
                None => return Err(ChannelError::NotRunning(LOOPBACK_SERVICE.to_string())),
            }
        };

        for identity in peers {
            deliver(&events, identity).await?;
        }
        Ok(())
    }
}

async fn deliver(
    events: &mpsc::Sender<ServiceEvent>,
    identity: serde_json::Value,
) -> ChannelResult<ChannelId> {
    let payload = match IdentityPayload::from_value(identity) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Dropping unparseable loopback identity");
            return Err(ChannelError::InvalidLocator(e.to_string()));
        }
    };

    let channel = Channel::new(LOOPBACK_SERVICE, payload, Box::new(LoopbackTransport));
    let id = channel.id();
    debug!(channel = id, "Loopback channel discovered");

    events
        .send(ServiceEvent::Discovered(channel))
        .await
        .map_err(|_| ChannelError::EventChannelClosed)?;
    Ok(id)
}

/// Programmatic control over a [`LoopbackChannelService`]
#[derive(Clone)]
pub struct LoopbackHandle {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl LoopbackHandle {
    /// Register a peer identity to be announced on identify requests
    pub fn add_peer(&self, identity: serde_json::Value) {
        let mut inner = self.inner.lock().expect("loopback state poisoned");
        inner.peers.push(identity);
    }

    /// Whether the service currently delivers events
    pub fn is_running(&self) -> bool {
        self.inner
            .lock()
            .expect("loopback state poisoned")
            .events
            .is_some()
    }

    /// Immediately emit a discovered channel for `identity`
    ///
    /// Returns the channel id, which can later be closed with
    /// [`close_channel`](Self::close_channel).
    pub async fn announce(&self, identity: serde_json::Value) -> ChannelResult<ChannelId> {
        let events = {
            let inner = self.inner.lock().expect("loopback state poisoned");
            inner
                .events
                .clone()
                .ok_or_else(|| ChannelError::NotRunning(LOOPBACK_SERVICE.to_string()))?
        };
        deliver(&events, identity).await
    }

    /// Simulate the remote side closing a channel
    pub async fn close_channel(&self, id: ChannelId) -> ChannelResult<()> {
        let events = {
            let inner = self.inner.lock().expect("loopback state poisoned");
            inner
                .events
                .clone()
                .ok_or_else(|| ChannelError::NotRunning(LOOPBACK_SERVICE.to_string()))?
        };
        events
            .send(ServiceEvent::ChannelClosed(id))
            .await
            .map_err(|_| ChannelError::EventChannelClosed)
    }
}
