//! Shared test utilities
//!
//! Timeout-aware channel helpers, recording doubles for the channel and
//! exporter seams, and configuration fixtures rooted in temporary
//! directories.

pub mod async_helpers;
pub mod fixtures;

pub use async_helpers::{
    broadcast_recv_timeout, recv_timeout, try_drain, wait_until, RecvTimeoutError,
    DEFAULT_TEST_TIMEOUT, SHORT_TEST_TIMEOUT,
};
pub use fixtures::{peer_identity, test_config, RecordingService, TestExporter};
