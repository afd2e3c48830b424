//! Configuration Module
//!
//! Tuning knobs for the built-in adapters, with documented defaults.

use std::time::Duration;

/// Default cadence of the memory adapter's background expiry sweep.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Default suffix appended to a key to form its advisory lock key.
pub const DEFAULT_LOCK_SUFFIX: &str = "_lock";

/// Default delay between advisory-lock acquisition attempts.
pub const DEFAULT_LOCK_RETRY: Duration = Duration::from_millis(50);

// == Memory Adapter Config ==
/// Configuration for [`MemoryAdapter`](crate::MemoryAdapter).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of live entries before LRU eviction kicks in.
    ///
    /// `0` means unbounded: no recency tracking and no eviction; only expiry
    /// removes entries.
    pub capacity: usize,
    /// Cadence of the background sweep that removes expired entries.
    pub cleanup_interval: Duration,
}

impl MemoryConfig {
    /// Creates a config with the given capacity and default sweep cadence.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Overrides the background sweep cadence.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

// == Redis Adapter Config ==
/// Configuration for [`RedisAdapter`](crate::RedisAdapter).
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Suffix appended to a key to form its advisory lock key.
    pub lock_suffix: String,
    /// Delay between attempts to acquire an advisory lock.
    pub lock_retry: Duration,
}

impl RedisConfig {
    /// Overrides the advisory-lock key suffix.
    pub fn with_lock_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.lock_suffix = suffix.into();
        self
    }

    /// Overrides the advisory-lock retry delay.
    pub fn with_lock_retry(mut self, delay: Duration) -> Self {
        self.lock_retry = delay;
        self
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            lock_suffix: DEFAULT_LOCK_SUFFIX.to_string(),
            lock_retry: DEFAULT_LOCK_RETRY,
        }
    }
}
