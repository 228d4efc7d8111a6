//! Export surface for object-manager-style consumers
//!
//! The registry mirrors itself onto an external exporter (IPC object
//! manager, GUI model, ...) by invoking this trait synchronously on every
//! add, remove and property mutation, so the exporter never polls.

use crate::core_device::DeviceSnapshot;
use crate::core_identity::DeviceId;

/// Prefix of every per-device export path
pub const EXPORT_PATH_PREFIX: &str = "/org/tether/Device";

/// Sink mirroring registry state
///
/// Callbacks run on the registry's event-handling path and must not call
/// back into the manager.
pub trait RegistryExporter: Send + Sync {
    fn device_added(&self, device: &DeviceSnapshot);
    fn device_changed(&self, device: &DeviceSnapshot);
    fn device_removed(&self, device: &DeviceSnapshot);
}

/// Stable addressable path for one device id
///
/// Characters outside `[A-Za-z0-9_]` are mapped to `_` so the path is
/// usable in object-path-like namespaces.
pub fn export_path(id: &DeviceId) -> String {
    let escaped: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{}/{}", EXPORT_PATH_PREFIX, escaped)
}
