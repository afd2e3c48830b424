//! Cache Adapter Contract
//!
//! Defines the operation surface every cache backend implements, the boxed
//! compute-callback type for the compute-on-miss operations, and the [`Expiry`]
//! report type.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Result;

// == Compute Callback ==
/// Caller-supplied callback for the compute-on-miss operations.
///
/// The callback is invoked at most once per call when the key is absent; its
/// value is stored with the supplied TTL. A callback error is surfaced as
/// [`CacheError::Callback`](crate::CacheError::Callback) and no entry is
/// written.
pub type ComputeFn<V> = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<V>> + Send>;

// == Expiry ==
/// Remaining lifetime of an entry, as reported by `ttl` and `update_ttl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No live entry exists for the key.
    Missing,
    /// The entry never expires.
    Never,
    /// The entry expires after this duration.
    After(Duration),
}

impl Expiry {
    /// Returns true when no live entry exists.
    pub fn is_missing(&self) -> bool {
        matches!(self, Expiry::Missing)
    }

    /// Returns the remaining duration, or None for `Missing` and `Never`.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Expiry::After(d) => Some(*d),
            _ => None,
        }
    }
}

// == Adapter Contract ==
/// Uniform operation surface over a cache backend.
///
/// A [`Cache`](crate::Cache) holds one adapter polymorphically and forwards
/// every operation to it, so callers stay backend-agnostic. Implementations
/// must be safe for concurrent calls from parallel tasks.
///
/// TTL rules shared by all operations that take one:
/// - `None` (and, equivalently, `Some(Duration::ZERO)`) means the entry never
///   expires.
/// - An entry whose TTL has elapsed is logically absent; deleting a key is
///   done with [`remove`](CacheAdapter::remove), never by writing a special
///   value or TTL.
#[async_trait]
pub trait CacheAdapter<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Stores a key/value pair, replacing any previous entry and its TTL.
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()>;

    /// Stores every pair in `entries` with the same TTL.
    ///
    /// Atomicity across keys is not guaranteed; each key follows the same
    /// rules as [`set`](CacheAdapter::set).
    async fn set_many(&self, entries: HashMap<String, V>, ttl: Option<Duration>) -> Result<()>;

    /// Stores the pair only if the key is absent (or expired).
    ///
    /// Returns true iff the entry was created by this call.
    async fn set_if_absent(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<bool>;

    /// Computes and stores a value only if the key is absent (or expired).
    ///
    /// Non-locking variant: the callback runs outside the lock and the key is
    /// re-checked before inserting, so concurrent callers may each run their
    /// callback but exactly one insertion wins. Returns true iff this call
    /// inserted its value.
    async fn compute_if_absent(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Like [`compute_if_absent`](CacheAdapter::compute_if_absent), but the
    /// callback runs under mutual exclusion for the key.
    ///
    /// Concurrent callers wait on the lock and skip the callback once the key
    /// is present. A slow callback blocks other writers for its duration.
    async fn compute_if_absent_locked(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Retrieves the value for a key, or None when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Retrieves the value for a key, storing and returning `value` when the
    /// key is absent.
    async fn get_or_set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<V>;

    /// Retrieves the value for a key, computing and storing one when absent.
    ///
    /// Non-locking variant; see
    /// [`compute_if_absent`](CacheAdapter::compute_if_absent) for the race
    /// semantics. When another caller wins the race, its value is returned.
    async fn get_or_compute(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<V>;

    /// Like [`get_or_compute`](CacheAdapter::get_or_compute), but the callback
    /// runs under mutual exclusion for the key (single-flight).
    async fn get_or_compute_locked(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<V>;

    /// Returns true iff a live (unexpired) entry exists for the key.
    async fn contains(&self, key: &str) -> Result<bool>;

    /// Returns the number of live entries.
    async fn len(&self) -> Result<usize>;

    /// Returns a snapshot copy of all live entries.
    async fn data(&self) -> Result<HashMap<String, V>>;

    /// Returns all live keys, most recently used first when the backend
    /// tracks recency.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Returns all live values, in the same order as
    /// [`keys`](CacheAdapter::keys).
    async fn values(&self) -> Result<Vec<V>>;

    /// Replaces the value of an existing entry without touching its expiry.
    ///
    /// Returns the previous value, or None when the key is absent (in which
    /// case nothing is stored).
    async fn update(&self, key: &str, value: V) -> Result<Option<V>>;

    /// Replaces the expiry of an existing entry without touching its value.
    ///
    /// Returns the previous remaining expiry; `Expiry::Missing` means the key
    /// was absent and nothing was written. `ttl = None` makes the entry
    /// permanent.
    async fn update_ttl(&self, key: &str, ttl: Option<Duration>) -> Result<Expiry>;

    /// Reports the remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> Result<Expiry>;

    /// Deletes the given keys.
    ///
    /// Returns the value of the last key (in argument order) that had a live
    /// entry, or None when none did.
    async fn remove(&self, keys: &[&str]) -> Result<Option<V>>;

    /// Deletes every entry.
    async fn clear(&self) -> Result<()>;

    /// Stops background work owned by the adapter.
    ///
    /// Idempotent: a second call must succeed. Whether operations after
    /// `close` fail or keep working is adapter-specific and documented on
    /// each implementation.
    async fn close(&self) -> Result<()>;
}
