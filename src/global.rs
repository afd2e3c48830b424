//! Global Cache Module
//!
//! Process-wide default cache, exposed as free functions so call sites
//! don't have to thread a handle around. Values are [`serde_json::Value`],
//! the common coin for heterogeneous callers; typed callers should hold
//! their own [`Cache<V>`] instead.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::adapter::Expiry;
use crate::cache::Cache;
use crate::error::Result;

/// The process-wide cache: unbounded memory, initialized on first use.
static CACHE: Lazy<Cache<Value>> = Lazy::new(Cache::default);

/// Returns a handle to the process-wide cache.
///
/// The handle shares the global adapter slot, so swapping a backend
/// through it (for example to Redis at startup) redirects every free
/// function in this module.
pub fn cache() -> Cache<Value> {
    CACHE.clone()
}

/// Stores a key/value pair in the global cache.
pub async fn set(key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
    CACHE.set(key, value, ttl).await
}

/// Stores every pair in `entries` with the same TTL.
pub async fn set_many(entries: HashMap<String, Value>, ttl: Option<Duration>) -> Result<()> {
    CACHE.set_many(entries, ttl).await
}

/// Stores the pair only if the key is absent (or expired).
pub async fn set_if_absent(key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
    CACHE.set_if_absent(key, value, ttl).await
}

/// Computes and stores a value only if the key is absent.
pub async fn compute_if_absent<F, Fut>(key: &str, f: F, ttl: Option<Duration>) -> Result<bool>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    CACHE.compute_if_absent(key, f, ttl).await
}

/// Computes and stores a value only if the key is absent, with the
/// callback under mutual exclusion for the key.
pub async fn compute_if_absent_locked<F, Fut>(
    key: &str,
    f: F,
    ttl: Option<Duration>,
) -> Result<bool>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    CACHE.compute_if_absent_locked(key, f, ttl).await
}

/// Retrieves the value for a key.
pub async fn get(key: &str) -> Result<Option<Value>> {
    CACHE.get(key).await
}

/// Retrieves the value for a key, storing `value` when absent.
pub async fn get_or_set(key: &str, value: Value, ttl: Option<Duration>) -> Result<Value> {
    CACHE.get_or_set(key, value, ttl).await
}

/// Retrieves the value for a key, computing one when absent.
pub async fn get_or_compute<F, Fut>(key: &str, f: F, ttl: Option<Duration>) -> Result<Value>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    CACHE.get_or_compute(key, f, ttl).await
}

/// Retrieves the value for a key, computing one when absent with
/// single-flight semantics.
pub async fn get_or_compute_locked<F, Fut>(
    key: &str,
    f: F,
    ttl: Option<Duration>,
) -> Result<Value>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    CACHE.get_or_compute_locked(key, f, ttl).await
}

/// Returns true iff a live entry exists for the key.
pub async fn contains(key: &str) -> Result<bool> {
    CACHE.contains(key).await
}

/// Returns the number of live entries.
pub async fn len() -> Result<usize> {
    CACHE.len().await
}

/// Returns a snapshot copy of all live entries.
pub async fn data() -> Result<HashMap<String, Value>> {
    CACHE.data().await
}

/// Returns the live keys.
pub async fn keys() -> Result<Vec<String>> {
    CACHE.keys().await
}

/// Returns the live values.
pub async fn values() -> Result<Vec<Value>> {
    CACHE.values().await
}

/// Replaces the value of a live entry without touching its expiry.
pub async fn update(key: &str, value: Value) -> Result<Option<Value>> {
    CACHE.update(key, value).await
}

/// Replaces the expiry of a live entry.
pub async fn update_ttl(key: &str, ttl: Option<Duration>) -> Result<Expiry> {
    CACHE.update_ttl(key, ttl).await
}

/// Returns the remaining lifetime of an entry.
pub async fn ttl(key: &str) -> Result<Expiry> {
    CACHE.ttl(key).await
}

/// Removes the given keys, returning the value of the last key found.
pub async fn remove(keys: &[&str]) -> Result<Option<Value>> {
    CACHE.remove(keys).await
}

/// Empties the global cache.
pub async fn clear() -> Result<()> {
    CACHE.clear().await
}

// == Unit Tests ==
// The global cache is shared across the test binary, so every test here
// works on its own key prefix and never asserts on len() or clear().
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_global_set_and_get() {
        set("global_roundtrip", json!(42), None).await.unwrap();

        assert_eq!(get("global_roundtrip").await.unwrap(), Some(json!(42)));
        assert!(contains("global_roundtrip").await.unwrap());
    }

    #[tokio::test]
    async fn test_global_compute_and_update() {
        let value = get_or_compute("global_compute", || async { Ok(json!("fresh")) }, None)
            .await
            .unwrap();
        assert_eq!(value, json!("fresh"));

        let old = update("global_compute", json!("replaced")).await.unwrap();
        assert_eq!(old, Some(json!("fresh")));
        assert_eq!(get("global_compute").await.unwrap(), Some(json!("replaced")));
    }

    #[tokio::test]
    async fn test_global_remove() {
        set("global_remove_a", json!(1), None).await.unwrap();
        set("global_remove_b", json!(2), None).await.unwrap();

        let last = remove(&["global_remove_a", "global_remove_b", "global_remove_c"])
            .await
            .unwrap();
        assert_eq!(last, Some(json!(2)));
        assert_eq!(get("global_remove_a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_global_ttl_flow() {
        set("global_ttl", json!(true), Some(Duration::from_secs(30)))
            .await
            .unwrap();

        match ttl("global_ttl").await.unwrap() {
            Expiry::After(remaining) => assert!(remaining <= Duration::from_secs(30)),
            other => panic!("expected After, got {:?}", other),
        }

        update_ttl("global_ttl", None).await.unwrap();
        assert_eq!(ttl("global_ttl").await.unwrap(), Expiry::Never);
    }

    #[tokio::test]
    async fn test_global_handle_matches_free_functions() {
        let handle = cache();
        handle.set("global_handle", json!("via handle"), None).await.unwrap();

        assert_eq!(
            get("global_handle").await.unwrap(),
            Some(json!("via handle"))
        );
    }
}
