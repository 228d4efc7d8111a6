//! Test fixtures
//!
//! Recording doubles for the channel-service and exporter seams, plus
//! configuration and identity builders.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::core_channel::{ChannelError, ChannelResult, ChannelService, ServiceEvent};
use crate::core_device::{DeviceSnapshot, RegistryExporter};

/// Configuration rooted in a fresh temporary directory
///
/// The [`TempDir`] must be kept alive for the duration of the test.
pub fn test_config() -> (Arc<Config>, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    (Arc::new(config), dir)
}

/// A peer identity payload with the given id and name
pub fn peer_identity(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "kind": "phone",
        "capabilities": ["ping"],
    })
}

/// A channel service double that records lifecycle and identify calls
pub struct RecordingService {
    name: String,
    schemes: Vec<String>,
    fail_start: bool,
    start_count: AtomicUsize,
    stop_count: AtomicUsize,
    identify_count: AtomicUsize,
    last_target: Mutex<Option<String>>,
    events: Mutex<Option<mpsc::Sender<ServiceEvent>>>,
}

impl RecordingService {
    pub fn new(name: &str, schemes: &[&str]) -> Self {
        RecordingService {
            name: name.to_string(),
            schemes: schemes.iter().map(|s| s.to_string()).collect(),
            fail_start: false,
            start_count: AtomicUsize::new(0),
            stop_count: AtomicUsize::new(0),
            identify_count: AtomicUsize::new(0),
            last_target: Mutex::new(None),
            events: Mutex::new(None),
        }
    }

    /// Make every start attempt fail
    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn identify_count(&self) -> usize {
        self.identify_count.load(Ordering::SeqCst)
    }

    pub fn last_target(&self) -> Option<String> {
        self.last_target.lock().expect("fixture poisoned").clone()
    }

    /// The event sender captured at the last start, if any
    ///
    /// A clone outlives a later `stop`, letting tests deliver events that
    /// were produced before the backend went down.
    pub fn event_sender(&self) -> Option<mpsc::Sender<ServiceEvent>> {
        self.events.lock().expect("fixture poisoned").clone()
    }
}

impl std::fmt::Debug for RecordingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingService")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl ChannelService for RecordingService {
    fn name(&self) -> &str {
        &self.name
    }

    fn schemes(&self) -> Vec<String> {
        self.schemes.clone()
    }

    async fn start(&self, events: mpsc::Sender<ServiceEvent>) -> ChannelResult<()> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ChannelError::StartFailed(self.name.clone()));
        }
        *self.events.lock().expect("fixture poisoned") = Some(events);
        Ok(())
    }

    async fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        *self.events.lock().expect("fixture poisoned") = None;
    }

    async fn identify(&self, target: Option<&str>) -> ChannelResult<()> {
        self.identify_count.fetch_add(1, Ordering::SeqCst);
        *self.last_target.lock().expect("fixture poisoned") = target.map(|t| t.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct ExporterLog {
    added: Vec<DeviceSnapshot>,
    changed: Vec<DeviceSnapshot>,
    removed: Vec<DeviceSnapshot>,
}

/// An exporter double that records every mirror callback
#[derive(Default)]
pub struct TestExporter {
    log: Mutex<ExporterLog>,
}

impl TestExporter {
    pub fn new() -> Arc<Self> {
        Arc::new(TestExporter::default())
    }

    pub fn added(&self) -> Vec<DeviceSnapshot> {
        self.log.lock().expect("fixture poisoned").added.clone()
    }

    pub fn changed(&self) -> Vec<DeviceSnapshot> {
        self.log.lock().expect("fixture poisoned").changed.clone()
    }

    pub fn removed(&self) -> Vec<DeviceSnapshot> {
        self.log.lock().expect("fixture poisoned").removed.clone()
    }
}

impl RegistryExporter for TestExporter {
    fn device_added(&self, snapshot: &DeviceSnapshot) {
        self.log
            .lock()
            .expect("fixture poisoned")
            .added
            .push(snapshot.clone());
    }

    fn device_changed(&self, snapshot: &DeviceSnapshot) {
        self.log
            .lock()
            .expect("fixture poisoned")
            .changed
            .push(snapshot.clone());
    }

    fn device_removed(&self, snapshot: &DeviceSnapshot) {
        self.log
            .lock()
            .expect("fixture poisoned")
            .removed
            .push(snapshot.clone());
    }
}
