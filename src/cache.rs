//! Cache Facade Module
//!
//! Thin holder of one [`CacheAdapter`], forwarding every operation to it.
//! The adapter lives behind a swap slot, so the backend can be replaced at
//! runtime; callers stay backend-agnostic.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::adapter::{CacheAdapter, ComputeFn, Expiry};
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::memory::MemoryAdapter;

/// Boxes a plain async closure into the adapter's compute callback shape.
fn boxed_compute<V, F, Fut>(f: F) -> ComputeFn<V>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

// == Cache Facade ==
/// Backend-agnostic cache handle.
///
/// Operations forward 1:1 to the held adapter. Clones share the same
/// adapter slot, so a [`swap`](Cache::swap) through one clone is seen by
/// all of them.
///
/// The compute-on-miss methods accept plain async closures; the boxed
/// [`ComputeFn`] form stays on the [`CacheAdapter`] trait.
#[derive(Clone)]
pub struct Cache<V> {
    adapter: Arc<RwLock<Arc<dyn CacheAdapter<V>>>>,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache over the given adapter.
    pub fn new<A>(adapter: A) -> Self
    where
        A: CacheAdapter<V> + 'static,
    {
        Self {
            adapter: Arc::new(RwLock::new(Arc::new(adapter))),
        }
    }

    /// Creates a cache over a fresh memory adapter.
    pub fn memory(config: MemoryConfig) -> Self {
        Self::new(MemoryAdapter::new(config))
    }

    /// Creates a cache over a bounded memory adapter.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(MemoryAdapter::with_capacity(capacity))
    }

    // == Backend Access ==
    /// Replaces the backend, returning the previous adapter.
    ///
    /// In-flight operations on the old adapter are not drained; the caller
    /// is responsible for quiescence (and for closing the old adapter).
    pub async fn swap<A>(&self, adapter: A) -> Arc<dyn CacheAdapter<V>>
    where
        A: CacheAdapter<V> + 'static,
    {
        let mut slot = self.adapter.write().await;
        std::mem::replace(&mut *slot, Arc::new(adapter))
    }

    /// Returns the current adapter.
    pub async fn backend(&self) -> Arc<dyn CacheAdapter<V>> {
        self.adapter.read().await.clone()
    }

    // == Operations ==
    /// Stores a key/value pair, replacing any previous entry and its TTL.
    pub async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        self.backend().await.set(key, value, ttl).await
    }

    /// Stores every pair in `entries` with the same TTL.
    pub async fn set_many(&self, entries: HashMap<String, V>, ttl: Option<Duration>) -> Result<()> {
        self.backend().await.set_many(entries, ttl).await
    }

    /// Stores the pair only if the key is absent (or expired).
    pub async fn set_if_absent(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<bool> {
        self.backend().await.set_if_absent(key, value, ttl).await
    }

    /// Computes and stores a value only if the key is absent; the callback
    /// runs without holding the lock. Returns true iff this call inserted.
    pub async fn compute_if_absent<F, Fut>(
        &self,
        key: &str,
        f: F,
        ttl: Option<Duration>,
    ) -> Result<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.backend()
            .await
            .compute_if_absent(key, boxed_compute(f), ttl)
            .await
    }

    /// Like [`compute_if_absent`](Cache::compute_if_absent), with the
    /// callback under mutual exclusion for the key.
    pub async fn compute_if_absent_locked<F, Fut>(
        &self,
        key: &str,
        f: F,
        ttl: Option<Duration>,
    ) -> Result<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.backend()
            .await
            .compute_if_absent_locked(key, boxed_compute(f), ttl)
            .await
    }

    /// Retrieves the value for a key, or None when absent or expired.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        self.backend().await.get(key).await
    }

    /// Retrieves the value for a key, storing `value` when absent.
    pub async fn get_or_set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<V> {
        self.backend().await.get_or_set(key, value, ttl).await
    }

    /// Retrieves the value for a key, computing one when absent; the
    /// callback runs without holding the lock.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        f: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.backend()
            .await
            .get_or_compute(key, boxed_compute(f), ttl)
            .await
    }

    /// Like [`get_or_compute`](Cache::get_or_compute), with single-flight
    /// semantics: among racing callers the callback runs once.
    pub async fn get_or_compute_locked<F, Fut>(
        &self,
        key: &str,
        f: F,
        ttl: Option<Duration>,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.backend()
            .await
            .get_or_compute_locked(key, boxed_compute(f), ttl)
            .await
    }

    /// Returns true iff a live entry exists for the key.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        self.backend().await.contains(key).await
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> Result<usize> {
        self.backend().await.len().await
    }

    /// Returns true when the cache holds no live entries.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Returns a snapshot copy of all live entries.
    pub async fn data(&self) -> Result<HashMap<String, V>> {
        self.backend().await.data().await
    }

    /// Returns the live keys, most recently used first on bounded memory
    /// backends.
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.backend().await.keys().await
    }

    /// Returns the live values, in the same order as [`keys`](Cache::keys).
    pub async fn values(&self) -> Result<Vec<V>> {
        self.backend().await.values().await
    }

    /// Replaces the value of a live entry without touching its expiry;
    /// returns the old value, or None when absent.
    pub async fn update(&self, key: &str, value: V) -> Result<Option<V>> {
        self.backend().await.update(key, value).await
    }

    /// Replaces the expiry of a live entry, returning the old remaining
    /// expiry.
    pub async fn update_ttl(&self, key: &str, ttl: Option<Duration>) -> Result<Expiry> {
        self.backend().await.update_ttl(key, ttl).await
    }

    /// Returns the remaining lifetime of an entry.
    pub async fn ttl(&self, key: &str) -> Result<Expiry> {
        self.backend().await.ttl(key).await
    }

    /// Removes the given keys, returning the value of the last key found.
    pub async fn remove(&self, keys: &[&str]) -> Result<Option<V>> {
        self.backend().await.remove(keys).await
    }

    /// Empties the cache.
    pub async fn clear(&self) -> Result<()> {
        self.backend().await.clear().await
    }

    /// Closes the current backend. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.backend().await.close().await
    }
}

impl<V> Default for Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// An unbounded memory cache.
    fn default() -> Self {
        Self::new(MemoryAdapter::unbounded())
    }
}
