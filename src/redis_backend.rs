//! Redis Adapter Module
//!
//! Maps the cache adapter contract onto a Redis command surface. Values are
//! stored as JSON strings, so this backend additionally requires
//! `V: Serialize + DeserializeOwned`.
//!
//! Single-flight for the locked compute operations uses a SETNX advisory
//! lock on a companion key (`<key><lock_suffix>`). The lock is best-effort:
//! it is not fenced and a crashed holder leaves it behind. The whole-store
//! operations (`len`, `data`, `keys`, `values`, `clear`) act on the selected
//! database via `DBSIZE`/`KEYS *`/`FLUSHDB` and are O(N), intended for
//! tooling rather than hot paths.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::adapter::{CacheAdapter, ComputeFn, Expiry};
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};

// == Value Codec ==
fn encode<V: Serialize>(value: &V) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<V: DeserializeOwned>(raw: &str) -> Result<V> {
    Ok(serde_json::from_str(raw)?)
}

/// Maps a TTL to the PX argument. None and zero both mean "no expiry";
/// sub-millisecond TTLs round up so they are not silently dropped.
fn px_millis(ttl: Option<Duration>) -> Option<u64> {
    match ttl {
        Some(d) if !d.is_zero() => Some((d.as_millis() as u64).max(1)),
        _ => None,
    }
}

// == Redis Adapter ==
/// Redis-backed cache adapter over a managed multiplexed connection.
///
/// The connection is caller-owned and shared: [`close`](CacheAdapter::close)
/// is a no-op and the adapter stays usable afterwards, unlike the memory
/// adapter. Expiry is enforced by the server, so there is no sweeper here.
pub struct RedisAdapter {
    conn: ConnectionManager,
    config: RedisConfig,
}

impl RedisAdapter {
    // == Constructors ==
    /// Creates an adapter over an existing managed connection.
    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_config(conn, RedisConfig::default())
    }

    /// Creates an adapter with a custom lock suffix and retry delay.
    pub fn with_config(conn: ConnectionManager, config: RedisConfig) -> Self {
        Self { conn, config }
    }

    /// Connects to a Redis URL and wraps the connection.
    ///
    /// # Arguments
    /// * `url` - Redis connection string, e.g. `redis://127.0.0.1:6379/0`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    // == Raw Commands ==
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(raw)
    }

    async fn set_raw(&self, key: &str, raw: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(raw);
        if let Some(millis) = px_millis(ttl) {
            cmd.arg("PX").arg(millis);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    /// SET NX; returns true iff the key was created.
    async fn set_raw_nx(&self, key: &str, raw: String, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(raw).arg("NX");
        if let Some(millis) = px_millis(ttl) {
            cmd.arg("PX").arg(millis);
        }
        let created: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(created.is_some())
    }

    async fn exists_raw(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found != 0)
    }

    /// PTTL: -2 = absent, -1 = no expiry, otherwise remaining milliseconds.
    async fn pttl_raw(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let millis: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(millis)
    }

    async fn keys_raw(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS").arg("*").query_async(&mut conn).await?;
        Ok(keys)
    }

    async fn mget_raw(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut conn = self.conn.clone();
        let raws: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(raws)
    }

    // == Advisory Lock ==
    fn lock_key(&self, key: &str) -> String {
        format!("{}{}", key, self.config.lock_suffix)
    }

    async fn acquire_lock(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let locked: i64 = redis::cmd("SETNX")
            .arg(self.lock_key(key))
            .arg(1)
            .query_async(&mut conn)
            .await?;
        Ok(locked == 1)
    }

    /// Best-effort release. A failure here must not mask the operation's
    /// outcome, so it is logged and swallowed; the lock is advisory.
    async fn release_lock(&self, key: &str) {
        let mut conn = self.conn.clone();
        let released: redis::RedisResult<i64> = redis::cmd("DEL")
            .arg(self.lock_key(key))
            .query_async(&mut conn)
            .await;
        if let Err(err) = released {
            warn!("Failed to release cache lock for '{}': {}", key, err);
        }
    }
}

#[async_trait]
impl<V> CacheAdapter<V> for RedisAdapter
where
    V: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        self.set_raw(key, encode(&value)?, ttl).await
    }

    async fn set_many(&self, entries: HashMap<String, V>, ttl: Option<Duration>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        match px_millis(ttl) {
            // No TTL: one atomic MSET.
            None => {
                let mut conn = self.conn.clone();
                let mut cmd = redis::cmd("MSET");
                for (key, value) in &entries {
                    cmd.arg(key).arg(encode(value)?);
                }
                let _: () = cmd.query_async(&mut conn).await?;
            }
            // With a TTL the keys land one by one; no cross-key atomicity.
            Some(millis) => {
                let mut conn = self.conn.clone();
                for (key, value) in &entries {
                    let _: () = redis::cmd("SET")
                        .arg(key)
                        .arg(encode(value)?)
                        .arg("PX")
                        .arg(millis)
                        .query_async(&mut conn)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<bool> {
        self.set_raw_nx(key, encode(&value)?, ttl).await
    }

    async fn compute_if_absent(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        if self.exists_raw(key).await? {
            return Ok(false);
        }
        let value = f().await.map_err(CacheError::Callback)?;
        // NX keeps "created by this call" honest against racing callers.
        self.set_raw_nx(key, encode(&value)?, ttl).await
    }

    async fn compute_if_absent_locked(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        if self.exists_raw(key).await? {
            return Ok(false);
        }
        // A held lock means another caller is computing: report "not set
        // by this call" instead of waiting.
        if !self.acquire_lock(key).await? {
            return Ok(false);
        }
        let outcome = AssertUnwindSafe(async {
            if self.exists_raw(key).await? {
                return Ok(false);
            }
            let value = f().await.map_err(CacheError::Callback)?;
            self.set_raw_nx(key, encode(&value)?, ttl).await
        })
        .catch_unwind()
        .await;
        self.release_lock(key).await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<V>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    async fn get_or_set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<V> {
        // The NX write doubles as the existence check.
        if self.set_raw_nx(key, encode(&value)?, ttl).await? {
            return Ok(value);
        }
        match self.get_raw(key).await? {
            Some(raw) => decode(&raw),
            // The competing entry vanished already; store ours after all.
            None => {
                self.set_raw(key, encode(&value)?, ttl).await?;
                Ok(value)
            }
        }
    }

    async fn get_or_compute(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<V> {
        if let Some(raw) = self.get_raw(key).await? {
            return decode(&raw);
        }
        let value = f().await.map_err(CacheError::Callback)?;
        if self.set_raw_nx(key, encode(&value)?, ttl).await? {
            return Ok(value);
        }
        // Lost the race; serve whichever value landed first.
        match self.get_raw(key).await? {
            Some(raw) => decode(&raw),
            None => {
                self.set_raw(key, encode(&value)?, ttl).await?;
                Ok(value)
            }
        }
    }

    async fn get_or_compute_locked(
        &self,
        key: &str,
        f: ComputeFn<V>,
        ttl: Option<Duration>,
    ) -> Result<V> {
        if let Some(raw) = self.get_raw(key).await? {
            return decode(&raw);
        }
        // Wait until this caller holds the lock or another caller's value
        // shows up. Each backoff sleep is a cancellation point.
        let filled_while_waiting = loop {
            if self.acquire_lock(key).await? {
                break None;
            }
            tokio::time::sleep(self.config.lock_retry).await;
            if let Some(raw) = self.get_raw(key).await? {
                break Some(raw);
            }
        };
        if let Some(raw) = filled_while_waiting {
            return decode(&raw);
        }

        let outcome = AssertUnwindSafe(async {
            // The key may have been filled between the last read and the
            // lock acquisition.
            if let Some(raw) = self.get_raw(key).await? {
                return decode::<V>(&raw);
            }
            let value = f().await.map_err(CacheError::Callback)?;
            self.set_raw(key, encode(&value)?, ttl).await?;
            Ok(value)
        })
        .catch_unwind()
        .await;
        self.release_lock(key).await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        self.exists_raw(key).await
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let size: i64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        Ok(size.max(0) as usize)
    }

    async fn data(&self) -> Result<HashMap<String, V>> {
        let keys = self.keys_raw().await?;
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let raws = self.mget_raw(&keys).await?;
        let mut data = HashMap::with_capacity(keys.len());
        for (key, raw) in keys.into_iter().zip(raws) {
            // A key can expire between KEYS and MGET; skip the holes.
            if let Some(raw) = raw {
                data.insert(key, decode(&raw)?);
            }
        }
        Ok(data)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.keys_raw().await
    }

    async fn values(&self) -> Result<Vec<V>> {
        let keys = self.keys_raw().await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let raws = self.mget_raw(&keys).await?;
        raws.into_iter()
            .flatten()
            .map(|raw| decode(&raw))
            .collect()
    }

    async fn update(&self, key: &str, value: V) -> Result<Option<V>> {
        let old = match self.get_raw(key).await? {
            Some(raw) => decode(&raw)?,
            None => return Ok(None),
        };
        // Read-then-write TTL preservation. A concurrent writer can change
        // the TTL between the two commands; callers must not rely on strict
        // preservation.
        let ttl = match self.pttl_raw(key).await? {
            -2 => return Ok(None),
            millis if millis > 0 => Some(Duration::from_millis(millis as u64)),
            _ => None,
        };
        self.set_raw(key, encode(&value)?, ttl).await?;
        Ok(Some(old))
    }

    async fn update_ttl(&self, key: &str, ttl: Option<Duration>) -> Result<Expiry> {
        let old = match self.pttl_raw(key).await? {
            -2 => return Ok(Expiry::Missing),
            -1 => Expiry::Never,
            millis => Expiry::After(Duration::from_millis(millis.max(0) as u64)),
        };
        let mut conn = self.conn.clone();
        match px_millis(ttl) {
            Some(millis) => {
                let _: i64 = redis::cmd("PEXPIRE")
                    .arg(key)
                    .arg(millis)
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: i64 = redis::cmd("PERSIST").arg(key).query_async(&mut conn).await?;
            }
        }
        Ok(old)
    }

    async fn ttl(&self, key: &str) -> Result<Expiry> {
        let expiry = match self.pttl_raw(key).await? {
            -2 => Expiry::Missing,
            -1 => Expiry::Never,
            millis => Expiry::After(Duration::from_millis(millis.max(0) as u64)),
        };
        Ok(expiry)
    }

    async fn remove(&self, keys: &[&str]) -> Result<Option<V>> {
        if keys.is_empty() {
            return Ok(None);
        }
        let mut conn = self.conn.clone();
        let raws: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        let _: i64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        match raws.into_iter().flatten().last() {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    /// The connection is caller-owned, so there is nothing to stop here.
    /// The adapter stays usable after close.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
