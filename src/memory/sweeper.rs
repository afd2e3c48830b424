//! Expiry Sweeper Module
//!
//! Background task that periodically removes expired cache entries from a
//! memory store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::memory::store::MemoryStore;

/// Spawns a background task that periodically removes expired entries.
///
/// The task runs in an infinite loop, sleeping for the given interval
/// between sweeps. Each sweep acquires the write lock on the store, so it
/// is serialized against all other mutations.
///
/// Returns None when no Tokio runtime is running or the interval is zero;
/// in both cases the store still works, with expired entries removed
/// lazily on access instead.
///
/// # Arguments
/// * `store` - Shared store to sweep
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which is aborted on adapter close.
pub(crate) fn spawn_sweeper<V>(
    store: Arc<RwLock<MemoryStore<V>>>,
    interval: Duration,
) -> Option<JoinHandle<()>>
where
    V: Clone + Send + Sync + 'static,
{
    if interval.is_zero() {
        debug!("Cache sweeper disabled; expired entries are removed lazily");
        return None;
    }
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            debug!("No tokio runtime; expired entries are removed lazily");
            return None;
        }
    };

    Some(handle.spawn(async move {
        info!("Starting cache sweeper with interval {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut store = store.write().await;
                store.remove_expired(Instant::now())
            };

            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_store(capacity: usize) -> Arc<RwLock<MemoryStore<u32>>> {
        Arc::new(RwLock::new(MemoryStore::new(capacity)))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let store = shared_store(100);

        {
            let mut guard = store.write().await;
            guard.set(
                "expire_soon".to_string(),
                1,
                Some(Duration::from_millis(50)),
                Instant::now(),
            );
        }

        let handle = spawn_sweeper(store.clone(), Duration::from_millis(100)).unwrap();

        // Wait for the entry to expire and at least one sweep to run.
        tokio::time::sleep(Duration::from_millis(300)).await;

        {
            let guard = store.read().await;
            // The sweep removed the entry outright; no lazy read was needed.
            assert_eq!(guard.stats().total_entries, 0);
            assert_eq!(guard.stats().expirations, 1);
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let store = shared_store(100);

        {
            let mut guard = store.write().await;
            guard.set(
                "long_lived".to_string(),
                1,
                Some(Duration::from_secs(3600)),
                Instant::now(),
            );
        }

        let handle = spawn_sweeper(store.clone(), Duration::from_millis(50)).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        {
            let guard = store.read().await;
            assert!(guard.contains("long_lived", Instant::now()));
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweeper_can_be_aborted() {
        let store = shared_store(100);

        let handle = spawn_sweeper(store, Duration::from_millis(50)).unwrap();
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test]
    async fn test_sweeper_zero_interval_disabled() {
        let store = shared_store(100);
        assert!(spawn_sweeper(store, Duration::ZERO).is_none());
    }

    #[test]
    fn test_sweeper_needs_runtime() {
        let store = shared_store(100);
        assert!(spawn_sweeper(store, Duration::from_secs(1)).is_none());
    }
}
