//! Error types for the cache crate
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for all cache adapters.
///
/// Errors are surfaced to the caller verbatim: the cache never retries a
/// backend failure, never swallows a callback failure, and never writes an
/// entry on an error path.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Operation attempted on an adapter after `close`
    #[error("cache adapter is closed")]
    Closed,

    /// A caller-supplied compute callback returned an error
    #[error("compute callback failed: {0}")]
    Callback(anyhow::Error),

    /// The remote backend returned an I/O or protocol error
    #[error("redis backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A value could not be (de)serialized for the remote backend
    #[error("value serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
