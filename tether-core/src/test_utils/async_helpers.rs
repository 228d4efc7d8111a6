//! Async test helpers
//!
//! Channel receive helpers with timeouts, so a missing notification fails
//! the test instead of hanging it.

use tokio::sync::{broadcast, mpsc};
use tokio::time::{timeout, Duration};

/// Default timeout for test receives (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Short timeout for asserting an event does NOT arrive (100ms)
pub const SHORT_TEST_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    Timeout,
    Closed,
}

impl std::fmt::Display for RecvTimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecvTimeoutError::Timeout => write!(f, "receive operation timed out"),
            RecvTimeoutError::Closed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for RecvTimeoutError {}

/// Receive from an mpsc channel with a timeout
pub async fn recv_timeout<T>(
    rx: &mut mpsc::Receiver<T>,
    duration: Duration,
) -> Result<T, RecvTimeoutError> {
    timeout(duration, rx.recv())
        .await
        .map_err(|_| RecvTimeoutError::Timeout)?
        .ok_or(RecvTimeoutError::Closed)
}

/// Receive from a broadcast channel with a timeout
///
/// Lag is treated as closure; notification tests are sized well below the
/// channel capacity.
pub async fn broadcast_recv_timeout<T: Clone>(
    rx: &mut broadcast::Receiver<T>,
    duration: Duration,
) -> Result<T, RecvTimeoutError> {
    timeout(duration, rx.recv())
        .await
        .map_err(|_| RecvTimeoutError::Timeout)?
        .map_err(|_| RecvTimeoutError::Closed)
}

/// Poll `condition` until it holds or `duration` elapses
pub async fn wait_until<F>(duration: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + duration;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Drain every message already queued on a broadcast receiver
pub fn try_drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut results = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        results.push(msg);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recv_timeout_success() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(42).await.unwrap();

        let result = recv_timeout(&mut rx, DEFAULT_TEST_TIMEOUT).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_recv_timeout_times_out() {
        let (_tx, mut rx) = mpsc::channel::<i32>(1);

        let result = recv_timeout(&mut rx, SHORT_TEST_TIMEOUT).await;
        assert_eq!(result.unwrap_err(), RecvTimeoutError::Timeout);
    }

    #[tokio::test]
    async fn test_broadcast_recv_timeout() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.send("hello").unwrap();

        let result = broadcast_recv_timeout(&mut rx, DEFAULT_TEST_TIMEOUT).await;
        assert_eq!(result.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_try_drain() {
        let (tx, mut rx) = broadcast::channel(8);
        for i in 0..5 {
            tx.send(i).unwrap();
        }

        assert_eq!(try_drain(&mut rx), vec![0, 1, 2, 3, 4]);
    }
}
