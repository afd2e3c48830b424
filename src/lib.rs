//! AnyCache - A pluggable async cache facade
//!
//! Ships an in-memory backend with TTL expiration and LRU eviction, a
//! Redis-backed adapter, and a process-wide default cache, all behind one
//! adapter contract.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod global;
pub mod memory;
pub mod redis_backend;

pub use adapter::{CacheAdapter, ComputeFn, Expiry};
pub use cache::Cache;
pub use config::{MemoryConfig, RedisConfig};
pub use error::{CacheError, Result};
pub use memory::{CacheStats, MemoryAdapter};
pub use redis_backend::RedisAdapter;
