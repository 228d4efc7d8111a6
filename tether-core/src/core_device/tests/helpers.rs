//! Shared setup for the device registry suite

use std::sync::Arc;
use tempfile::TempDir;

use crate::core_channel::{ChannelId, LoopbackChannelService, LoopbackHandle};
use crate::core_device::DeviceManager;
use crate::core_identity::DeviceId;
use crate::test_utils::{peer_identity, test_config, wait_until, DEFAULT_TEST_TIMEOUT};

pub fn id(s: &str) -> DeviceId {
    DeviceId::new(s).expect("valid test id")
}

/// A started manager wired to a loopback backend
pub async fn loopback_manager() -> (DeviceManager, LoopbackHandle, TempDir) {
    let (config, dir) = test_config();
    let manager = DeviceManager::new_sync(config).expect("manager construction");

    let service = LoopbackChannelService::new();
    let handle = service.handle();
    manager
        .register_service(Arc::new(service))
        .await
        .expect("service registration");
    manager.start().await;

    (manager, handle, dir)
}

/// Announce a peer and wait until the registry shows it connected
pub async fn connect_peer(
    manager: &DeviceManager,
    handle: &LoopbackHandle,
    peer: &str,
) -> ChannelId {
    let channel = handle
        .announce(peer_identity(peer, peer))
        .await
        .expect("announce");

    let peer_id = id(peer);
    assert!(
        wait_until(DEFAULT_TEST_TIMEOUT, || {
            manager
                .get_device(&peer_id)
                .map(|d| d.connected)
                .unwrap_or(false)
        })
        .await,
        "peer {peer} never connected"
    );
    channel
}

/// Close a peer's channel and wait until the registry shows it
/// disconnected or removed
pub async fn close_peer(
    manager: &DeviceManager,
    handle: &LoopbackHandle,
    peer: &str,
    channel: ChannelId,
) {
    handle.close_channel(channel).await.expect("close");

    let peer_id = id(peer);
    assert!(
        wait_until(DEFAULT_TEST_TIMEOUT, || {
            manager
                .get_device(&peer_id)
                .map(|d| !d.connected)
                .unwrap_or(true)
        })
        .await,
        "peer {peer} never disconnected"
    );
}
