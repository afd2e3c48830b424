//! Memory Adapter Module
//!
//! In-memory cache backend with LRU eviction, TTL expiration, and a
//! background expiry sweeper.

mod entry;
mod lru;
mod stats;
mod store;
mod sweeper;


// Re-export public types
pub use stats::CacheStats;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::adapter::{CacheAdapter, ComputeFn, Expiry};
use crate::config::MemoryConfig;
use crate::error::{CacheError, Result};
use crate::memory::store::MemoryStore;

// == Memory Adapter ==
/// Thread-safe in-memory cache adapter.
///
/// Wraps a [`MemoryStore`] in a readers/writer lock. Reads that promote an
/// entry in the LRU order ([`get`](CacheAdapter::get) and friends) take the
/// write lock; metadata reads (`contains`, `len`, `data`, `keys`, `values`,
/// `ttl`) share the read lock and leave stale entries for the sweeper.
///
/// [`close`](CacheAdapter::close) stops the sweeper and fails every later
/// operation with [`CacheError::Closed`].
#[derive(Debug)]
pub struct MemoryAdapter<V> {
    /// Shared store, also held by the sweeper task
    store: Arc<RwLock<MemoryStore<V>>>,
    /// Set by close; checked by every operation
    closed: AtomicBool,
    /// Background expiry task, absent without a runtime
    sweeper: Option<JoinHandle<()>>,
}

impl<V> MemoryAdapter<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates an adapter from a config, spawning the expiry sweeper when a
    /// Tokio runtime is available.
    pub fn new(config: MemoryConfig) -> Self {
        let store = Arc::new(RwLock::new(MemoryStore::new(config.capacity)));
        let sweeper = sweeper::spawn_sweeper(store.clone(), config.cleanup_interval);
        Self {
            store,
            closed: AtomicBool::new(false),
            sweeper,
        }
    }

    /// Creates a bounded adapter with default sweep cadence.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(MemoryConfig::new(capacity))
    }

    /// Creates an unbounded adapter: no LRU tracking, only expiry removes
    /// entries.
    pub fn unbounded() -> Self {
        Self::new(MemoryConfig::default())
    }

    // == Stats ==
    /// Returns a snapshot of hit/miss/eviction/expiration counters.
    ///
    /// Diagnostics only; not part of the adapter contract.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<V> Default for MemoryAdapter<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl<V> CacheAdapter<V> for MemoryAdapter<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        store.set(key.to_string(), value, ttl, Instant::now());
        Ok(())
    }

    async fn set_many(&self, entries: HashMap<String, V>, ttl: Option<Duration>) -> Result<()> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        let now = Instant::now();
        for (key, value) in entries {
            store.set(key, value, ttl, now);
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<bool> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.set_if_absent(key.to_string(), value, ttl, Instant::now()))
    }

    async fn compute_if_absent(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.ensure_open()?;
        {
            let store = self.store.read().await;
            if store.contains(key, Instant::now()) {
                return Ok(false);
            }
        }
        // The callback runs with no lock held; racing callers may each get
        // here, and the re-check below lets exactly one insertion win.
        let value = f().await.map_err(CacheError::Callback)?;
        let mut store = self.store.write().await;
        Ok(store.set_if_absent(key.to_string(), value, ttl, Instant::now()))
    }

    async fn compute_if_absent_locked(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        if store.contains(key, Instant::now()) {
            return Ok(false);
        }
        // The write lock is held across the callback: racing callers wait
        // here and see the key present once the winner has stored it.
        let value = f().await.map_err(CacheError::Callback)?;
        store.set(key.to_string(), value, ttl, Instant::now());
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.get(key, Instant::now()))
    }

    async fn get_or_set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<V> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.get_or_set(key.to_string(), value, ttl, Instant::now()))
    }

    async fn get_or_compute(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<V> {
        self.ensure_open()?;
        {
            let mut store = self.store.write().await;
            if let Some(value) = store.get(key, Instant::now()) {
                return Ok(value);
            }
        }
        let value = f().await.map_err(CacheError::Callback)?;
        let mut store = self.store.write().await;
        let now = Instant::now();
        // Another caller may have filled the key while the callback ran.
        if let Some(existing) = store.lookup(key, now, true) {
            return Ok(existing);
        }
        let stored = value.clone();
        store.set(key.to_string(), value, ttl, now);
        Ok(stored)
    }

    async fn get_or_compute_locked(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<V> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        if let Some(value) = store.get(key, Instant::now()) {
            return Ok(value);
        }
        let value = f().await.map_err(CacheError::Callback)?;
        let stored = value.clone();
        store.set(key.to_string(), value, ttl, Instant::now());
        Ok(stored)
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.contains(key, Instant::now()))
    }

    async fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.len_live(Instant::now()))
    }

    async fn data(&self) -> Result<HashMap<String, V>> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.data(Instant::now()))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.keys(Instant::now()))
    }

    async fn values(&self) -> Result<Vec<V>> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.values(Instant::now()))
    }

    async fn update(&self, key: &str, value: V) -> Result<Option<V>> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.update(key, value, Instant::now()))
    }

    async fn update_ttl(&self, key: &str, ttl: Option<Duration>) -> Result<Expiry> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.update_ttl(key, ttl, Instant::now()))
    }

    async fn ttl(&self, key: &str) -> Result<Expiry> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.ttl(key, Instant::now()))
    }

    async fn remove(&self, keys: &[&str]) -> Result<Option<V>> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.remove_many(keys, Instant::now()))
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        store.clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(sweeper) = &self.sweeper {
            sweeper.abort();
        }
        debug!("Memory cache adapter closed");
        Ok(())
    }
}

impl<V> Drop for MemoryAdapter<V> {
    fn drop(&mut self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.abort();
        }
    }
}
