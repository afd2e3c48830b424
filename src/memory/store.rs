//! Memory Store Module
//!
//! Synchronous cache engine combining HashMap storage with LRU tracking and
//! TTL expiration. The async adapter in [`crate::memory`] wraps this store in
//! a readers/writer lock; everything here assumes the caller already holds
//! the right side of that lock.
//!
//! Time is passed in explicitly so the adapter takes one clock reading per
//! operation and tests can fabricate instants instead of sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::adapter::Expiry;
use crate::memory::entry::{deadline, Entry};
use crate::memory::lru::LruList;
use crate::memory::stats::CacheStats;

// == Memory Store ==
/// Bounded key/value storage with LRU eviction and TTL support.
///
/// A capacity of 0 means unbounded: no recency tracking and no eviction,
/// only expiry removes entries.
#[derive(Debug)]
pub(crate) struct MemoryStore<V> {
    /// Key-value storage
    map: HashMap<String, Entry<V>>,
    /// Recency list, unused when capacity is 0
    lru: LruList,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries, 0 = unbounded
    capacity: usize,
}

impl<V: Clone> MemoryStore<V> {
    // == Constructor ==
    /// Creates a new store with the given capacity (0 = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            lru: LruList::new(),
            stats: CacheStats::new(),
            capacity,
        }
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// An existing key is overwritten, its TTL reset, and the entry counts
    /// as recently used. A new key evicts the least recently used entry
    /// first when the store is full.
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>, now: Instant) {
        self.insert(key, value, ttl, now);
        self.stats.set_total_entries(self.map.len());
    }

    // == Get ==
    /// Retrieves a value by key, recording a hit or miss.
    ///
    /// A live entry moves to the front of the LRU list. A stale entry is
    /// removed and reads as absent.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        match self.lookup(key, now, true) {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Lookup ==
    /// Retrieves a value by key without recording a hit or miss.
    ///
    /// Used by the compute-on-miss re-check so one logical lookup does not
    /// count twice. A stale entry is still removed; `touch` controls whether
    /// a live entry moves to the front.
    pub fn lookup(&mut self, key: &str, now: Instant, touch: bool) -> Option<V> {
        let entry = self.map.get(key)?;
        if entry.is_expired(now) {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.map.len());
            return None;
        }
        let value = entry.value.clone();
        let id = entry.lru;
        if touch {
            if let Some(id) = id {
                self.lru.move_to_front(id);
            }
        }
        Some(value)
    }

    // == Set If Absent ==
    /// Stores the value only when the key is absent or expired.
    ///
    /// Returns true iff the entry was created.
    pub fn set_if_absent(&mut self, key: String, value: V, ttl: Option<Duration>, now: Instant) -> bool {
        if self.contains(&key, now) {
            return false;
        }
        self.set(key, value, ttl, now);
        true
    }

    // == Get Or Set ==
    /// Returns the live value for the key, storing and returning `value`
    /// when the key is absent or expired.
    pub fn get_or_set(&mut self, key: String, value: V, ttl: Option<Duration>, now: Instant) -> V {
        if let Some(existing) = self.get(&key, now) {
            return existing;
        }
        let stored = value.clone();
        self.set(key, value, ttl, now);
        stored
    }

    // == Contains ==
    /// Returns true iff a live entry exists. Does not touch the LRU order.
    pub fn contains(&self, key: &str, now: Instant) -> bool {
        matches!(self.map.get(key), Some(entry) if !entry.is_expired(now))
    }

    // == Live Length ==
    /// Returns the number of live entries.
    pub fn len_live(&self, now: Instant) -> usize {
        self.map.values().filter(|entry| !entry.is_expired(now)).count()
    }

    // == Data ==
    /// Returns a snapshot copy of all live entries.
    pub fn data(&self, now: Instant) -> HashMap<String, V> {
        self.map
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Keys ==
    /// Returns the live keys, most recently used first when the store is
    /// bounded. An unbounded store has no recency order.
    pub fn keys(&self, now: Instant) -> Vec<String> {
        if self.capacity > 0 {
            self.lru
                .iter()
                .filter(|key| self.contains(key, now))
                .map(str::to_string)
                .collect()
        } else {
            self.map
                .iter()
                .filter(|(_, entry)| !entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect()
        }
    }

    // == Values ==
    /// Returns the live values in the same order as [`Self::keys`].
    pub fn values(&self, now: Instant) -> Vec<V> {
        self.keys(now)
            .iter()
            .filter_map(|key| self.map.get(key).map(|entry| entry.value.clone()))
            .collect()
    }

    // == Update ==
    /// Replaces the value of a live entry without touching its expiry.
    ///
    /// Returns the old value, or None when the key is absent or expired
    /// (no entry is created). The updated entry counts as recently used.
    pub fn update(&mut self, key: &str, value: V, now: Instant) -> Option<V> {
        let stale = matches!(self.map.get(key), Some(entry) if entry.is_expired(now));
        if stale {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.map.len());
            return None;
        }
        let entry = self.map.get_mut(key)?;
        let old = std::mem::replace(&mut entry.value, value);
        let id = entry.lru;
        if let Some(id) = id {
            self.lru.move_to_front(id);
        }
        Some(old)
    }

    // == Update TTL ==
    /// Replaces the expiry of a live entry, returning the old remaining
    /// expiry. Returns [`Expiry::Missing`] without writing when the key is
    /// absent or expired. Does not touch the LRU order.
    pub fn update_ttl(&mut self, key: &str, ttl: Option<Duration>, now: Instant) -> Expiry {
        let stale = matches!(self.map.get(key), Some(entry) if entry.is_expired(now));
        if stale {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.map.len());
            return Expiry::Missing;
        }
        match self.map.get_mut(key) {
            Some(entry) => {
                let old = entry.remaining(now);
                entry.expires_at = deadline(ttl, now);
                old
            }
            None => Expiry::Missing,
        }
    }

    // == TTL ==
    /// Returns the remaining expiry of a live entry. Does not remove stale
    /// entries (shared-lock path).
    pub fn ttl(&self, key: &str, now: Instant) -> Expiry {
        match self.map.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.remaining(now),
            _ => Expiry::Missing,
        }
    }

    // == Remove ==
    /// Removes the given keys, returning the value of the last key that
    /// held a live entry. Stale entries are removed but read as absent.
    pub fn remove_many(&mut self, keys: &[&str], now: Instant) -> Option<V> {
        let mut last = None;
        for key in keys {
            if let Some(entry) = self.remove_entry(key) {
                if !entry.is_expired(now) {
                    last = Some(entry.value);
                }
            }
        }
        self.stats.set_total_entries(self.map.len());
        last
    }

    // == Clear ==
    /// Empties the store.
    pub fn clear(&mut self) {
        self.map.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Remove Expired ==
    /// Removes all entries whose deadline has passed.
    ///
    /// Returns the number of entries removed. This is the periodic sweep
    /// body; the caller holds the exclusive lock.
    pub fn remove_expired(&mut self, now: Instant) -> usize {
        let stale: Vec<String> = self
            .map
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = stale.len();
        for key in &stale {
            self.remove_entry(key);
            self.stats.record_expiration();
        }
        self.stats.set_total_entries(self.map.len());
        count
    }

    // == Stats ==
    /// Returns current statistics with the entry count refreshed.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.map.len());
        stats
    }

    // == Capacity ==
    /// Returns the configured capacity (0 = unbounded).
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Consistency Check ==
    /// Returns true when the map and the LRU list agree: same length, and
    /// every entry's handle resolves back to its own key. Unbounded stores
    /// must carry no handles at all.
    #[cfg(test)]
    pub fn handles_consistent(&self) -> bool {
        if self.capacity == 0 {
            return self.lru.is_empty() && self.map.values().all(|entry| entry.lru.is_none());
        }
        self.map.len() == self.lru.len()
            && self.map.iter().all(|(key, entry)| match entry.lru {
                Some(id) => self.lru.key_of(id) == key,
                None => false,
            })
    }

    // == Internal Helpers ==
    /// Upsert path shared by the set variants.
    fn insert(&mut self, key: String, value: V, ttl: Option<Duration>, now: Instant) {
        if let Some(entry) = self.map.get_mut(&key) {
            entry.value = value;
            entry.expires_at = deadline(ttl, now);
            let id = entry.lru;
            if let Some(id) = id {
                self.lru.move_to_front(id);
            }
            return;
        }

        // New key: evict the least recently used entry before inserting
        // when the store is full.
        if self.capacity > 0 && self.map.len() >= self.capacity {
            if let Some(victim) = self.lru.evict_oldest() {
                self.map.remove(&victim);
                self.stats.record_eviction();
            }
        }

        let mut entry = Entry::new(value, ttl, now);
        if self.capacity > 0 {
            entry.lru = Some(self.lru.push_front(key.clone()));
        }
        self.map.insert(key, entry);
    }

    /// Removes an entry from the map and unlinks its LRU node.
    fn remove_entry(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.map.remove(key)?;
        if let Some(id) = entry.lru {
            self.lru.remove(id);
        }
        Some(entry)
    }
}
