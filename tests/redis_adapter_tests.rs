//! Integration Tests for the Redis Adapter
//!
//! These tests need a reachable Redis server, so they are ignored by
//! default. Point them at a disposable database (the clear test issues
//! FLUSHDB) and run:
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1:6379/15 cargo test --test redis_adapter_tests -- --ignored
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anycache::{Cache, CacheError, ComputeFn, Expiry, RedisAdapter};
use tokio::time::sleep;

// == Helper Functions ==

async fn redis_cache<V>() -> Cache<V>
where
    V: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let adapter = RedisAdapter::connect(&url)
        .await
        .expect("Redis must be reachable for ignored integration tests");
    Cache::new(adapter)
}

/// Compute callback that bumps a shared counter before returning.
fn counted(calls: Arc<AtomicUsize>, value: &str) -> ComputeFn<String> {
    let value = value.to_string();
    Box::new(move || {
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(100)).await;
            Ok(value)
        })
    })
}

// == Round Trip Tests ==

#[tokio::test]
#[ignore]
async fn test_redis_set_and_get_roundtrip() {
    let cache: Cache<String> = redis_cache().await;
    cache.remove(&["rt:key"]).await.unwrap();

    cache.set("rt:key", "value".into(), None).await.unwrap();

    assert_eq!(cache.get("rt:key").await.unwrap(), Some("value".into()));
    assert!(cache.contains("rt:key").await.unwrap());
    assert_eq!(cache.get("rt:absent").await.unwrap(), None);

    cache.remove(&["rt:key"]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_set_many_roundtrip() {
    let cache: Cache<u32> = redis_cache().await;
    cache.remove(&["many:a", "many:b"]).await.unwrap();

    let mut entries = HashMap::new();
    entries.insert("many:a".to_string(), 1);
    entries.insert("many:b".to_string(), 2);

    // No TTL takes the MSET path.
    cache.set_many(entries.clone(), None).await.unwrap();
    assert_eq!(cache.get("many:a").await.unwrap(), Some(1));
    assert_eq!(cache.get("many:b").await.unwrap(), Some(2));
    assert_eq!(cache.ttl("many:a").await.unwrap(), Expiry::Never);

    // A TTL switches to per-key writes.
    cache
        .set_many(entries, Some(Duration::from_secs(30)))
        .await
        .unwrap();
    assert!(matches!(cache.ttl("many:a").await.unwrap(), Expiry::After(_)));
    assert!(matches!(cache.ttl("many:b").await.unwrap(), Expiry::After(_)));

    cache.remove(&["many:a", "many:b"]).await.unwrap();
}

// == TTL Tests ==

#[tokio::test]
#[ignore]
async fn test_redis_entry_expires_after_ttl() {
    let cache: Cache<String> = redis_cache().await;

    cache
        .set("ttl:key", "soon".into(), Some(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(cache.get("ttl:key").await.unwrap(), Some("soon".into()));
    match cache.ttl("ttl:key").await.unwrap() {
        Expiry::After(remaining) => assert!(remaining <= Duration::from_millis(200)),
        other => panic!("expected After, got {:?}", other),
    }

    sleep(Duration::from_millis(400)).await;
    assert_eq!(cache.get("ttl:key").await.unwrap(), None);
    assert_eq!(cache.ttl("ttl:key").await.unwrap(), Expiry::Missing);
}

#[tokio::test]
#[ignore]
async fn test_redis_zero_ttl_means_no_expiry() {
    let cache: Cache<String> = redis_cache().await;

    cache
        .set("ttl:pinned", "stays".into(), Some(Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(cache.ttl("ttl:pinned").await.unwrap(), Expiry::Never);
    assert_eq!(cache.get("ttl:pinned").await.unwrap(), Some("stays".into()));

    cache.remove(&["ttl:pinned"]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_update_ttl_transitions() {
    let cache: Cache<u32> = redis_cache().await;
    cache.remove(&["ttl:tr"]).await.unwrap();

    cache.set("ttl:tr", 7, Some(Duration::from_secs(60))).await.unwrap();

    // Finite -> never uses PERSIST.
    let old = cache.update_ttl("ttl:tr", None).await.unwrap();
    assert!(matches!(old, Expiry::After(_)));
    assert_eq!(cache.ttl("ttl:tr").await.unwrap(), Expiry::Never);

    // Never -> finite uses PEXPIRE.
    let old = cache
        .update_ttl("ttl:tr", Some(Duration::from_secs(30)))
        .await
        .unwrap();
    assert_eq!(old, Expiry::Never);
    assert!(matches!(cache.ttl("ttl:tr").await.unwrap(), Expiry::After(_)));

    assert_eq!(cache.update_ttl("ttl:absent", None).await.unwrap(), Expiry::Missing);

    cache.remove(&["ttl:tr"]).await.unwrap();
}

// == Conditional Write Tests ==

#[tokio::test]
#[ignore]
async fn test_redis_set_if_absent_first_write_wins() {
    let cache: Cache<String> = redis_cache().await;
    cache.remove(&["nx:key"]).await.unwrap();

    assert!(cache.set_if_absent("nx:key", "first".into(), None).await.unwrap());
    assert!(!cache.set_if_absent("nx:key", "second".into(), None).await.unwrap());
    assert_eq!(cache.get("nx:key").await.unwrap(), Some("first".into()));

    cache.remove(&["nx:key"]).await.unwrap();
    assert!(cache.set_if_absent("nx:key", "third".into(), None).await.unwrap());

    cache.remove(&["nx:key"]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_get_or_set_returns_existing_value() {
    let cache: Cache<u32> = redis_cache().await;
    cache.remove(&["gos:key"]).await.unwrap();

    assert_eq!(cache.get_or_set("gos:key", 1, None).await.unwrap(), 1);
    assert_eq!(cache.get_or_set("gos:key", 2, None).await.unwrap(), 1);

    cache.remove(&["gos:key"]).await.unwrap();
}

// == Update Tests ==

#[tokio::test]
#[ignore]
async fn test_redis_update_preserves_remaining_ttl() {
    let cache: Cache<String> = redis_cache().await;
    cache.remove(&["upd:key"]).await.unwrap();

    cache
        .set("upd:key", "before".into(), Some(Duration::from_secs(2)))
        .await
        .unwrap();

    let old = cache.update("upd:key", "after".into()).await.unwrap();
    assert_eq!(old, Some("before".into()));
    assert_eq!(cache.get("upd:key").await.unwrap(), Some("after".into()));

    match cache.ttl("upd:key").await.unwrap() {
        Expiry::After(remaining) => {
            assert!(remaining > Duration::ZERO);
            assert!(remaining <= Duration::from_secs(2));
        }
        other => panic!("expected After, got {:?}", other),
    }

    assert_eq!(cache.update("upd:absent", "v".into()).await.unwrap(), None);

    cache.remove(&["upd:key"]).await.unwrap();
}

// == Removal Tests ==

#[tokio::test]
#[ignore]
async fn test_redis_remove_returns_last_found_value() {
    let cache: Cache<u32> = redis_cache().await;

    cache.set("rm:a", 1, None).await.unwrap();
    cache.set("rm:b", 2, None).await.unwrap();

    let last = cache.remove(&["rm:a", "rm:b", "rm:absent"]).await.unwrap();
    assert_eq!(last, Some(2));
    assert_eq!(cache.get("rm:a").await.unwrap(), None);
    assert_eq!(cache.get("rm:b").await.unwrap(), None);

    assert_eq!(cache.remove(&["rm:a", "rm:b"]).await.unwrap(), None);
}

// == Whole Database Tests ==

// len/data/keys/values and clear read or wipe the whole database; run
// them together against a database this suite owns.
#[tokio::test]
#[ignore]
async fn test_redis_clear_and_database_views() {
    let cache: Cache<u32> = redis_cache().await;

    cache.clear().await.unwrap();
    assert_eq!(cache.len().await.unwrap(), 0);

    cache.set("db:a", 1, None).await.unwrap();
    cache.set("db:b", 2, None).await.unwrap();

    assert_eq!(cache.len().await.unwrap(), 2);

    let data = cache.data().await.unwrap();
    assert_eq!(data.get("db:a"), Some(&1));
    assert_eq!(data.get("db:b"), Some(&2));

    let keys = cache.keys().await.unwrap();
    let values = cache.values().await.unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(values.len(), 2);

    cache.clear().await.unwrap();
    assert_eq!(cache.len().await.unwrap(), 0);
    assert!(cache.data().await.unwrap().is_empty());
}

// == Compute Callback Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_redis_locked_compute_runs_callback_once() {
    let cache: Cache<String> = redis_cache().await;
    // A crashed previous run may have left the advisory lock behind; its
    // raw value is not JSON, so ignore the decode result and keep the DEL.
    let _ = cache.remove(&["lk:shared", "lk:shared_lock"]).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        let f = counted(calls.clone(), "winner");
        handles.push(tokio::spawn(async move {
            cache.get_or_compute_locked("lk:shared", f, None).await.unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "winner");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.remove(&["lk:shared"]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_compute_error_releases_lock() {
    let cache: Cache<u32> = redis_cache().await;
    let _ = cache.remove(&["err:key", "err:key_lock"]).await;

    let err = cache
        .get_or_compute_locked("err:key", || async { Err(anyhow::anyhow!("backend offline")) }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Callback(_)));
    assert!(!cache.contains("err:key").await.unwrap());

    // The advisory lock must be gone, or this second attempt would stall.
    let value = cache
        .get_or_compute_locked("err:key", || async { Ok(5) }, None)
        .await
        .unwrap();
    assert_eq!(value, 5);

    cache.remove(&["err:key"]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_compute_panic_releases_lock() {
    let cache: Cache<u32> = redis_cache().await;
    let _ = cache.remove(&["pnc:key", "pnc:key_lock"]).await;

    // Panic inside the locked compute callback.
    let cache_in_task = cache.clone();
    let worker = tokio::spawn(async move {
        let f: ComputeFn<u32> = Box::new(|| Box::pin(async { panic!("injected panic") }));
        cache_in_task.get_or_compute_locked("pnc:key", f, None).await
    });
    assert!(worker.await.unwrap_err().is_panic());

    // The advisory lock key must be gone and nothing stored.
    assert!(!cache.contains("pnc:key_lock").await.unwrap());
    assert_eq!(cache.get("pnc:key").await.unwrap(), None);

    // The next locked compute proceeds instead of stalling on a stale lock.
    let value = tokio::time::timeout(Duration::from_secs(2), async {
        cache
            .get_or_compute_locked("pnc:key", || async { Ok(5) }, None)
            .await
            .unwrap()
    })
    .await
    .unwrap();
    assert_eq!(value, 5);

    cache.remove(&["pnc:key"]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_compute_if_absent_skips_existing() {
    let cache: Cache<String> = redis_cache().await;
    cache.remove(&["cia:key"]).await.unwrap();

    let created = cache
        .compute_if_absent("cia:key", || async { Ok("fresh".to_string()) }, None)
        .await
        .unwrap();
    assert!(created);

    let created = cache
        .compute_if_absent("cia:key", || async { Ok("other".to_string()) }, None)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(cache.get("cia:key").await.unwrap(), Some("fresh".into()));

    cache.remove(&["cia:key"]).await.unwrap();
}

// == Lifecycle Tests ==

#[tokio::test]
#[ignore]
async fn test_redis_close_leaves_connection_usable() {
    let cache: Cache<String> = redis_cache().await;

    // The adapter does not own the connection, so close is a no-op and
    // later operations still succeed.
    cache.close().await.unwrap();
    cache.close().await.unwrap();

    cache.set("cl:key", "still here".into(), None).await.unwrap();
    assert_eq!(cache.get("cl:key").await.unwrap(), Some("still here".into()));

    cache.remove(&["cl:key"]).await.unwrap();
}
