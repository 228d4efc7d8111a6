//! Per-peer device entity
//!
//! A device combines two independent axes: pairing (the persisted trust
//! decision) and connectivity (whether a live channel is attached). The
//! device exclusively owns its channel; a newly discovered channel for the
//! same id supersedes and closes the previous one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::export::export_path;
use crate::core_channel::{Channel, ChannelId};
use crate::core_identity::{DeviceId, DeviceKind, IdentityRecord};

/// Pairing axis of the device state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    /// No trust relationship
    Unpaired,
    /// We asked the peer to pair
    PairRequested,
    /// The peer asked us to pair
    PairIncoming,
    /// Trust established and persisted
    Paired,
}

/// Registry entry for one remote peer
pub struct Device {
    id: DeviceId,
    name: Option<String>,
    kind: DeviceKind,
    pairing: PairingState,
    capabilities: BTreeSet<String>,
    channel: Option<Channel>,
}

impl Device {
    /// Seed a device from a persisted record: disconnected, pairing as
    /// persisted
    pub fn from_record(record: &IdentityRecord) -> Self {
        Device {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind,
            pairing: if record.paired {
                PairingState::Paired
            } else {
                PairingState::Unpaired
            },
            capabilities: BTreeSet::new(),
            channel: None,
        }
    }

    /// Create a device for a first discovery: connected, unpaired
    ///
    /// `id` must be the validated id from the channel's identity payload.
    pub fn from_discovery(id: DeviceId, channel: Channel) -> Self {
        let mut device = Device {
            id,
            name: None,
            kind: DeviceKind::Unknown,
            pairing: PairingState::Unpaired,
            capabilities: BTreeSet::new(),
            channel: None,
        };
        device.attach(channel);
        device
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn pairing(&self) -> PairingState {
        self.pairing
    }

    pub fn paired(&self) -> bool {
        self.pairing == PairingState::Paired
    }

    pub fn connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Id of the attached channel, if any
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel.as_ref().map(|c| c.id())
    }

    /// Name of the service that produced the attached channel, if any
    pub fn channel_service(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.service())
    }

    /// Attach a live channel, refreshing identity metadata from its
    /// payload
    ///
    /// Returns the superseded channel if one was attached; the caller
    /// drops it, which closes the transport.
    pub fn attach(&mut self, channel: Channel) -> Option<Channel> {
        let identity = channel.identity();
        if let Some(name) = &identity.name {
            self.name = Some(name.clone());
        }
        self.kind = identity.kind;
        self.capabilities = identity.capabilities.clone();

        self.channel.replace(channel)
    }

    /// Detach the current channel, transitioning to disconnected
    pub fn detach(&mut self) -> Option<Channel> {
        self.channel.take()
    }

    pub fn set_pairing(&mut self, pairing: PairingState) {
        self.pairing = pairing;
    }

    /// Value snapshot for external consumers
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            pairing: self.pairing,
            paired: self.paired(),
            connected: self.connected(),
            capabilities: self.capabilities.clone(),
            export_path: export_path(&self.id),
        }
    }

    /// Persisted form of the current identity and pairing flag
    pub fn record(&self) -> IdentityRecord {
        IdentityRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            paired: self.paired(),
        }
    }
}

/// Immutable view of one device, safe to hand out of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub name: Option<String>,
    pub kind: DeviceKind,
    pub pairing: PairingState,
    pub paired: bool,
    pub connected: bool,
    pub capabilities: BTreeSet<String>,
    /// Stable addressable path for object-manager-style exporters
    pub export_path: String,
}
