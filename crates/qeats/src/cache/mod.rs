//! Shared key/value cache collaborator.
//!
//! The geo index only needs two primitives: read a whole value and write a
//! whole value with a time-to-live. Connections are scoped: a
//! [`CachePool::acquire`] hands out a guard that returns itself to the pool
//! when dropped, on every exit path.

mod memory;

use std::{sync::Arc, time::Duration};

use crate::search::SearchResult;
pub use error::{CacheError, Result};
pub use memory::{CacheStats, InMemoryCache, InMemoryConnection};

/// Default lifetime of a cached nearby list.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Source of scoped cache connections.
pub trait CachePool: Send + Sync {
    type Connection<'a>: CacheConnection
    where
        Self: 'a;

    fn acquire(&self) -> Result<Self::Connection<'_>>;
}

/// A single borrowed cache connection.
pub trait CacheConnection {
    /// Stored bytes for `key`, `None` when missing or expired.
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set_with_ttl(&mut self, key: &str, payload: &[u8], ttl: Duration) -> Result<()>;
}

impl<T: CachePool + ?Sized> CachePool for Arc<T> {
    type Connection<'a>
        = T::Connection<'a>
    where
        Self: 'a;

    fn acquire(&self) -> Result<Self::Connection<'_>> {
        (**self).acquire()
    }
}

/// Serialize a result list into the cached JSON payload.
pub fn encode_results(results: &[SearchResult]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(results)?)
}

/// Parse a cached JSON payload back into a result list.
pub fn decode_results(payload: &[u8]) -> Result<Vec<SearchResult>> {
    Ok(serde_json::from_slice(payload)?)
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CacheError {
        #[error("Cache unavailable: {0}")]
        Unavailable(String),
        #[error("Cache payload serialization error: {0}")]
        Serialization(#[from] serde_json::Error),
    }

    pub type Result<T> = std::result::Result<T, CacheError>;
}
