//! Device manager
//!
//! The central coordinator of the registry: seeds devices from the
//! identity store at construction, consumes discovery events from the
//! channel service registry, resolves each event to a device (existing or
//! new) and applies the retention policy on every connectivity or pairing
//! transition.
//!
//! All registry mutations happen either on the event pump task or inside a
//! caller-invoked operation; each takes the state lock for the whole
//! mutation, so a transition and its retention decision are atomic with
//! respect to the next event. Notifications are delivered while the lock
//! is still held, so subscribers and the exporter observe transitions in
//! the order they were applied; `Added` for an id always reaches them
//! before any later `Removed` for the same id.
//!
//! # Retention policy
//!
//! A device that is both unpaired and disconnected is removed from the
//! registry synchronously, inside the handler that produced the
//! transition. Paired devices survive disconnection indefinitely and can
//! reconnect later.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::device::{Device, DeviceSnapshot, PairingState};
use super::errors::{ManagerError, ManagerResult};
use super::export::RegistryExporter;
use crate::config::Config;
use crate::core_channel::{
    Channel, ChannelId, ChannelService, ChannelServiceRegistry, ServiceDescriptor, ServiceEvent,
};
use crate::core_identity::{DeviceId, IdentityStore, LocalIdentity};

/// Capacity of the fan-in channel from services and of the notification
/// channel to subscribers
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Registry notifications delivered to external subscribers
///
/// Fired exactly once per logical transition, in the order the transitions
/// were processed. No two `Added` for the same id are ever delivered
/// without an intervening `Removed`.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Added(DeviceSnapshot),
    Removed(DeviceSnapshot),
}

/// Pending notification computed while the state lock is held
enum Emit {
    Added(DeviceSnapshot),
    Changed(DeviceSnapshot),
    Removed(DeviceSnapshot),
}

struct RegistryState {
    devices: HashMap<DeviceId, Device>,
    /// Live channel ids to their owning device, for close routing
    channels: HashMap<ChannelId, DeviceId>,
    /// Backends whose discoveries are rejected; events from a backend can
    /// still be in flight after it was disabled
    disabled_services: HashSet<String>,
    exporter: Option<Arc<dyn RegistryExporter>>,
}

/// State shared between the manager handle and its event pump
struct Shared {
    state: Mutex<RegistryState>,
    store: IdentityStore,
    events_tx: broadcast::Sender<DeviceEvent>,
}

impl Shared {
    /// Deliver notifications for transitions just applied
    ///
    /// Called with the state lock held, so delivery order matches mutation
    /// order across the pump and caller tasks. Exporter callbacks must not
    /// call back into the manager (see [`RegistryExporter`]).
    fn emit(&self, exporter: Option<Arc<dyn RegistryExporter>>, emits: Vec<Emit>) {
        for emit in emits {
            match emit {
                Emit::Added(snapshot) => {
                    if let Some(exporter) = &exporter {
                        exporter.device_added(&snapshot);
                    }
                    let _ = self.events_tx.send(DeviceEvent::Added(snapshot));
                }
                Emit::Changed(snapshot) => {
                    if let Some(exporter) = &exporter {
                        exporter.device_changed(&snapshot);
                    }
                }
                Emit::Removed(snapshot) => {
                    if let Some(exporter) = &exporter {
                        exporter.device_removed(&snapshot);
                    }
                    let _ = self.events_tx.send(DeviceEvent::Removed(snapshot));
                }
            }
        }
    }

    /// Identity resolution for one discovery event
    fn handle_discovery(&self, mut channel: Channel) {
        let id = match channel.identity().device_id() {
            Ok(id) => id,
            Err(e) => {
                // Protocol violation: reject the channel, mutate nothing
                warn!(channel = channel.id(), error = %e, "Rejecting channel with invalid identity");
                channel.close();
                return;
            }
        };

        let mut guard = self.state.lock().expect("registry state poisoned");
        if guard.disabled_services.contains(channel.service()) {
            // The backend was disabled while this event was in flight
            warn!(
                channel = channel.id(),
                service = channel.service(),
                "Rejecting channel from disabled service"
            );
            drop(guard);
            channel.close();
            return;
        }

        let state = &mut *guard;
        let channel_id = channel.id();
        let mut emits = Vec::new();

        let record = match state.devices.get_mut(&id) {
            Some(device) => {
                // Known id: the new channel supersedes any prior one
                if let Some(superseded) = device.attach(channel) {
                    debug!(id = %id, channel = superseded.id(), "Superseding channel");
                    state.channels.remove(&superseded.id());
                }
                state.channels.insert(channel_id, id.clone());
                emits.push(Emit::Changed(device.snapshot()));
                device.record()
            }
            None => {
                let device = Device::from_discovery(id.clone(), channel);
                state.channels.insert(channel_id, id.clone());
                let record = device.record();
                emits.push(Emit::Added(device.snapshot()));
                info!(id = %id, "Device added");
                state.devices.insert(id.clone(), device);
                record
            }
        };

        // Write-through; a failed snapshot write is diagnostic, not fatal
        if let Err(e) = self.store.save(&record) {
            warn!(id = %id, error = %e, "Failed to persist identity record");
        }

        let exporter = state.exporter.clone();
        self.emit(exporter, emits);
    }

    /// Remote or transport-initiated close of one channel
    fn handle_channel_closed(&self, channel_id: ChannelId) {
        let mut guard = self.state.lock().expect("registry state poisoned");
        let state = &mut *guard;
        let mut emits = Vec::new();

        let Some(id) = state.channels.remove(&channel_id) else {
            // Stale close for a superseded or already-detached channel
            return;
        };

        if let Some(device) = state.devices.get_mut(&id) {
            if device.channel_id() == Some(channel_id) {
                device.detach();
                debug!(id = %id, channel = channel_id, "Device disconnected");
                emits.push(Emit::Changed(device.snapshot()));
                Self::apply_retention(state, &id, &mut emits);
            }
        }

        let exporter = state.exporter.clone();
        self.emit(exporter, emits);
    }

    /// Remove the device if it is now unpaired and disconnected
    fn apply_retention(state: &mut RegistryState, id: &DeviceId, emits: &mut Vec<Emit>) {
        let remove = state
            .devices
            .get(id)
            .map(|d| !d.paired() && !d.connected())
            .unwrap_or(false);

        if remove {
            let device = state.devices.remove(id).expect("checked above");
            info!(id = %id, "Device removed");
            emits.push(Emit::Removed(device.snapshot()));
        }
    }

    /// Detach one device's channel through the normal retention path
    fn detach_device(&self, id: &DeviceId) -> ManagerResult<()> {
        let mut guard = self.state.lock().expect("registry state poisoned");
        let state = &mut *guard;
        let mut emits = Vec::new();

        let device = state
            .devices
            .get_mut(id)
            .ok_or_else(|| ManagerError::DeviceNotFound(id.to_string()))?;

        if let Some(channel) = device.detach() {
            state.channels.remove(&channel.id());
            emits.push(Emit::Changed(device.snapshot()));
        }
        Self::apply_retention(state, id, &mut emits);

        let exporter = state.exporter.clone();
        self.emit(exporter, emits);
        Ok(())
    }

    /// Detach every live channel (manager stop)
    fn detach_all(&self) {
        let ids: Vec<DeviceId> = {
            let guard = self.state.lock().expect("registry state poisoned");
            guard.devices.keys().cloned().collect()
        };
        for id in ids {
            let _ = self.detach_device(&id);
        }
    }

    /// Mark a backend's discoveries as rejected or accepted
    fn mark_service_disabled(&self, service: &str, disabled: bool) {
        let mut guard = self.state.lock().expect("registry state poisoned");
        if disabled {
            guard.disabled_services.insert(service.to_string());
        } else {
            guard.disabled_services.remove(service);
        }
    }

    /// Detach channels produced by one service (service disabled)
    fn detach_service(&self, service: &str) {
        let ids: Vec<DeviceId> = {
            let guard = self.state.lock().expect("registry state poisoned");
            guard
                .devices
                .values()
                .filter(|d| d.channel_service() == Some(service))
                .map(|d| d.id().clone())
                .collect()
        };
        for id in ids {
            let _ = self.detach_device(&id);
        }
    }

    /// Apply a pairing transition with write-through persistence
    fn update_pairing(&self, id: &DeviceId, pairing: PairingState) -> ManagerResult<()> {
        let mut guard = self.state.lock().expect("registry state poisoned");
        let state = &mut *guard;
        let mut emits = Vec::new();

        let device = state
            .devices
            .get_mut(id)
            .ok_or_else(|| ManagerError::DeviceNotFound(id.to_string()))?;

        if device.pairing() == pairing {
            return Ok(());
        }
        device.set_pairing(pairing);
        info!(id = %id, pairing = ?pairing, "Pairing state changed");

        match pairing {
            PairingState::Paired => self.store.save(&device.record())?,
            PairingState::Unpaired => {
                if device.connected() {
                    self.store.save(&device.record())?;
                } else {
                    self.store.delete(id)?;
                }
            }
            // Pending requests are transient, never persisted
            PairingState::PairRequested | PairingState::PairIncoming => {}
        }

        emits.push(Emit::Changed(device.snapshot()));
        Self::apply_retention(state, id, &mut emits);

        let exporter = state.exporter.clone();
        self.emit(exporter, emits);
        Ok(())
    }
}

/// The registry of remote peer devices
///
/// Construct with [`new`](DeviceManager::new) (async) or
/// [`new_sync`](DeviceManager::new_sync) (blocking, for contexts without a
/// running loop); both seed the registry from persisted records and leave
/// identical state behind.
pub struct DeviceManager {
    config: Arc<Config>,
    local: LocalIdentity,
    shared: Arc<Shared>,
    services: Arc<AsyncMutex<ChannelServiceRegistry>>,
    service_rx: Arc<AsyncMutex<mpsc::Receiver<ServiceEvent>>>,
    started: AtomicBool,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceManager {
    /// Blocking constructor: credentials, store load and registry seeding
    ///
    /// Fails if the configuration root is unusable or credential material
    /// cannot be created or read.
    pub fn new_sync(config: Arc<Config>) -> ManagerResult<Self> {
        config.validate()?;

        let local = LocalIdentity::load_or_generate(&config.data_dir)?;
        let store = IdentityStore::new(config.data_dir.join("devices"))?;

        let mut devices = HashMap::new();
        for record in store.load_all()? {
            devices.insert(record.id.clone(), Device::from_record(&record));
        }
        info!(
            local_id = %local.id(),
            seeded = devices.len(),
            "Device manager constructed"
        );

        let (service_tx, service_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(DeviceManager {
            config,
            local,
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState {
                    devices,
                    channels: HashMap::new(),
                    disabled_services: HashSet::new(),
                    exporter: None,
                }),
                store,
                events_tx,
            }),
            services: Arc::new(AsyncMutex::new(ChannelServiceRegistry::new(service_tx))),
            service_rx: Arc::new(AsyncMutex::new(service_rx)),
            started: AtomicBool::new(false),
            pump: Mutex::new(None),
        })
    }

    /// Async constructor with the same post-conditions as
    /// [`new_sync`](Self::new_sync)
    pub async fn new(config: Arc<Config>) -> ManagerResult<Self> {
        tokio::task::spawn_blocking(move || Self::new_sync(config))
            .await
            .map_err(|e| ManagerError::Runtime(e.to_string()))?
    }

    /// The local device id, derived from the local certificate
    pub fn device_id(&self) -> &DeviceId {
        self.local.id()
    }

    /// The local certificate bytes
    pub fn certificate(&self) -> &[u8] {
        self.local.certificate()
    }

    /// Register a transport backend
    ///
    /// Enablement comes from `transports` in the configuration; unknown
    /// backends default to enabled.
    pub async fn register_service(&self, service: Arc<dyn ChannelService>) -> ManagerResult<()> {
        let enabled = self.config.transports.is_enabled(service.name());
        if !enabled {
            self.shared.mark_service_disabled(service.name(), true);
        }
        self.services.lock().await.register(service, enabled)?;
        Ok(())
    }

    /// React to an external enable/disable toggle for one backend
    ///
    /// Disabling closes only that backend's live channels; persisted
    /// (paired) devices are not dropped. Discoveries the backend produced
    /// before the toggle but that arrive afterward are rejected.
    pub async fn set_service_enabled(&self, name: &str, enabled: bool) -> ManagerResult<()> {
        if !enabled {
            // Mark first so queued events from this backend are rejected
            // even if they race the stop
            self.shared.mark_service_disabled(name, true);
        }
        let result = self.services.lock().await.set_enabled(name, enabled).await;
        if result.is_err() && !enabled {
            self.shared.mark_service_disabled(name, false);
        }
        result?;
        if enabled {
            self.shared.mark_service_disabled(name, false);
        } else {
            self.shared.detach_service(name);
        }
        Ok(())
    }

    /// Snapshot of every configured backend
    pub async fn service_descriptors(&self) -> Vec<ServiceDescriptor> {
        self.services.lock().await.descriptors()
    }

    /// Start every enabled backend and begin consuming discovery events
    ///
    /// Idempotent; calling twice is a no-op.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = self.shared.clone();
        let service_rx = self.service_rx.clone();
        let handle = tokio::spawn(async move {
            // Hold the receiver for the lifetime of this pump; stop()
            // aborts the task, releasing it for a later restart.
            let mut rx = service_rx.lock().await;
            while let Some(event) = rx.recv().await {
                match event {
                    ServiceEvent::Discovered(channel) => shared.handle_discovery(channel),
                    ServiceEvent::ChannelClosed(id) => shared.handle_channel_closed(id),
                }
            }
        });
        *self.pump.lock().expect("pump handle poisoned") = Some(handle);

        self.services.lock().await.start().await;
        info!("Device manager started");
    }

    /// Stop every backend, cancel in-flight discovery and detach all
    /// channels
    ///
    /// Devices transition to disconnected through the retention path;
    /// persisted records are untouched.
    pub async fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }

        self.services.lock().await.stop().await;

        if let Some(handle) = self.pump.lock().expect("pump handle poisoned").take() {
            handle.abort();
        }

        // Discard events queued before the services stopped; dropping a
        // Discovered closes its transport.
        {
            let mut rx = self.service_rx.lock().await;
            while rx.try_recv().is_ok() {}
        }

        self.shared.detach_all();
        info!("Device manager stopped");
    }

    /// Broadcast an identify request, or route it to the backend handling
    /// the target's scheme
    pub async fn identify(&self, target: Option<&str>) -> ManagerResult<()> {
        self.services.lock().await.identify(target).await?;
        Ok(())
    }

    /// Look up one device
    pub fn get_device(&self, id: &DeviceId) -> Option<DeviceSnapshot> {
        let guard = self.shared.state.lock().expect("registry state poisoned");
        guard.devices.get(id).map(|d| d.snapshot())
    }

    /// Snapshot of the current device set (order not significant)
    pub fn get_devices(&self) -> Vec<DeviceSnapshot> {
        let guard = self.shared.state.lock().expect("registry state poisoned");
        guard.devices.values().map(|d| d.snapshot()).collect()
    }

    /// Subscribe to `Added`/`Removed` notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Install an exporter mirror, replaying the current device set
    ///
    /// The replay happens under the state lock, so no transition can
    /// reach the exporter out of order with it.
    pub fn set_exporter(&self, exporter: Arc<dyn RegistryExporter>) {
        let mut guard = self.shared.state.lock().expect("registry state poisoned");
        guard.exporter = Some(exporter.clone());
        for device in guard.devices.values() {
            exporter.device_added(&device.snapshot());
        }
    }

    /// Remove the exporter mirror
    pub fn clear_exporter(&self) {
        let mut guard = self.shared.state.lock().expect("registry state poisoned");
        guard.exporter = None;
    }

    fn require_connected(&self, id: &DeviceId) -> ManagerResult<()> {
        let guard = self.shared.state.lock().expect("registry state poisoned");
        let device = guard
            .devices
            .get(id)
            .ok_or_else(|| ManagerError::DeviceNotFound(id.to_string()))?;
        if !device.connected() {
            return Err(ManagerError::NotConnected(id.to_string()));
        }
        Ok(())
    }

    /// Ask the peer to pair; requires a live channel
    pub fn request_pair(&self, id: &DeviceId) -> ManagerResult<()> {
        self.require_connected(id)?;
        self.shared.update_pairing(id, PairingState::PairRequested)
    }

    /// Record a pair request received from the peer; requires a live
    /// channel
    ///
    /// Called by the protocol layer when the remote side asks to pair;
    /// `accept_pair` or `reject_pair` resolves it.
    pub fn incoming_pair_request(&self, id: &DeviceId) -> ManagerResult<()> {
        self.require_connected(id)?;
        self.shared.update_pairing(id, PairingState::PairIncoming)
    }

    /// Accept pairing; persists the trust decision
    pub fn accept_pair(&self, id: &DeviceId) -> ManagerResult<()> {
        self.shared.update_pairing(id, PairingState::Paired)
    }

    /// Reject or revoke pairing
    ///
    /// The persisted record is deleted if the device is also disconnected;
    /// retention then removes the device.
    pub fn reject_pair(&self, id: &DeviceId) -> ManagerResult<()> {
        self.shared.update_pairing(id, PairingState::Unpaired)
    }

    /// Force-detach a device's live channel through the retention path
    pub fn disconnect(&self, id: &DeviceId) -> ManagerResult<()> {
        self.shared.detach_device(id)
    }

    /// Explicit forget: delete the persisted record and drop the device
    pub fn forget(&self, id: &DeviceId) -> ManagerResult<()> {
        let mut guard = self.shared.state.lock().expect("registry state poisoned");
        let state = &mut *guard;

        let mut device = state
            .devices
            .remove(id)
            .ok_or_else(|| ManagerError::DeviceNotFound(id.to_string()))?;
        if let Some(channel) = device.detach() {
            state.channels.remove(&channel.id());
        }
        self.shared.store.delete(id)?;
        info!(id = %id, "Device forgotten");

        let exporter = state.exporter.clone();
        self.shared
            .emit(exporter, vec![Emit::Removed(device.snapshot())]);
        Ok(())
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        if let Ok(mut pump) = self.pump.lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}
