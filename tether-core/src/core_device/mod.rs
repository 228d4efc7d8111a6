//! Device registry
//!
//! Remote peers as two-axis state machines (pairing x connectivity), the
//! manager coordinating them, and the exporter seam for mirroring the
//! registry onto external surfaces.

mod device;
mod errors;
mod export;
mod manager;

#[cfg(test)]
mod tests;

pub use device::{Device, DeviceSnapshot, PairingState};
pub use errors::{ManagerError, ManagerResult};
pub use export::{export_path, RegistryExporter, EXPORT_PATH_PREFIX};
pub use manager::{DeviceEvent, DeviceManager};
