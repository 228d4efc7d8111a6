//! Live transport channels
//!
//! A [`Channel`] is one open connection to a peer, produced by a channel
//! service and owned by exactly one device from the moment identity
//! resolution succeeds until transport close or supersession.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core_identity::IdentityPayload;

/// Process-unique channel identifier
pub type ChannelId = u64;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// The transport half of a channel
///
/// `close` tears down the underlying resources and must be idempotent. It
/// must not emit a [`super::ServiceEvent::ChannelClosed`]; that event is
/// reserved for remote-initiated closes the owner does not know about yet.
pub trait ChannelTransport: Send + fmt::Debug {
    fn close(&mut self);
}

/// One live connection to a peer
pub struct Channel {
    id: ChannelId,
    service: String,
    identity: IdentityPayload,
    transport: Box<dyn ChannelTransport>,
    closed: bool,
}

impl Channel {
    /// Wrap an opened transport together with the peer's claimed identity
    pub fn new(
        service: impl Into<String>,
        identity: IdentityPayload,
        transport: Box<dyn ChannelTransport>,
    ) -> Self {
        Channel {
            id: NEXT_CHANNEL_ID.fetch_add(1, Ordering::SeqCst),
            service: service.into(),
            identity,
            transport,
            closed: false,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Name of the channel service that produced this channel
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The identity the peer presented when the channel opened
    pub fn identity(&self) -> &IdentityPayload {
        &self.identity
    }

    /// Close the underlying transport
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("peer", &self.identity.id)
            .field("closed", &self.closed)
            .finish()
    }
}
