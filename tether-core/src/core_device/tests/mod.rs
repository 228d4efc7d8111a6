//! Device registry test suite
//!
//! End-to-end coverage of discovery, retention, pairing persistence,
//! identify routing and the exporter mirror, all driven through the
//! loopback backend.


pub mod helpers;
