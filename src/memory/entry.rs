//! Cache Entry Module
//!
//! Defines the structure for individual in-memory cache entries.

use std::time::{Duration, Instant};

use crate::adapter::Expiry;
use crate::memory::lru::NodeId;

// == Cache Entry ==
/// A single stored entry: value, optional deadline, optional LRU handle.
///
/// The handle is `None` when the store is unbounded (no recency tracking).
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Absolute expiration instant; None = never expires
    pub expires_at: Option<Instant>,
    /// Handle of this entry's node in the LRU list
    pub lru: Option<NodeId>,
}

impl<V> Entry<V> {
    /// Creates an entry whose deadline is `ttl` from `now`.
    ///
    /// A `None` or zero TTL produces an entry that never expires.
    pub fn new(value: V, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: deadline(ttl, now),
            lru: None,
        }
    }

    /// Checks whether the entry's deadline has passed.
    ///
    /// An entry is expired once `now` reaches the deadline, so a TTL that has
    /// fully elapsed reads as absent immediately.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Reports the remaining lifetime relative to `now`.
    pub fn remaining(&self, now: Instant) -> Expiry {
        match self.expires_at {
            None => Expiry::Never,
            // Saturates to zero at the deadline; callers treat expired
            // entries as absent before asking.
            Some(deadline) => Expiry::After(deadline.saturating_duration_since(now)),
        }
    }
}

// == Utility Functions ==
/// Converts a TTL into an absolute deadline. None and zero mean "never".
pub(crate) fn deadline(ttl: Option<Duration>, now: Instant) -> Option<Instant> {
    match ttl {
        None => None,
        Some(d) if d.is_zero() => None,
        Some(d) => Some(now + d),
    }
}
