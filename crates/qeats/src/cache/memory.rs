use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::Serialize;
use tracing::trace;

use super::{CacheConnection, CacheError, CachePool, Result};

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    writes: AtomicUsize,
    open_connections: AtomicUsize,
}

/// Snapshot of [`InMemoryCache`] activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
    pub open_connections: usize,
    pub entries: usize,
}

/// Process-local cache backed by a `DashMap`.
///
/// Expired entries are removed lazily on read. Switching the cache off with
/// [`set_available`](Self::set_available) makes every acquire fail, which is
/// how tests simulate an outage.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    available: AtomicBool,
    counters: Counters,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            counters: Counters::default(),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Overwrite a raw payload without going through a connection.
    pub fn insert_raw(&self, key: impl Into<String>, payload: impl Into<Vec<u8>>, ttl: Duration) {
        self.entries.insert(
            key.into(),
            Entry {
                payload: payload.into(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            open_connections: self.counters.open_connections.load(Ordering::SeqCst),
            entries: self.entries.len(),
        }
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        // The shard guard must be gone before `remove_if` locks the same shard.
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.payload.clone()));

        match lookup {
            Some(Some(payload)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                trace!(key, "Evicted expired cache entry");
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }
}

impl CachePool for InMemoryCache {
    type Connection<'a> = InMemoryConnection<'a>;

    fn acquire(&self) -> Result<Self::Connection<'_>> {
        if !self.is_available() {
            return Err(CacheError::Unavailable("in-memory cache switched off".to_string()));
        }
        self.counters.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection { cache: self })
    }
}

/// Connection guard for [`InMemoryCache`]; released on drop.
#[derive(Debug)]
pub struct InMemoryConnection<'a> {
    cache: &'a InMemoryCache,
}

impl InMemoryConnection<'_> {
    fn ensure_available(&self) -> Result<()> {
        if self.cache.is_available() {
            Ok(())
        } else {
            Err(CacheError::Unavailable("connection lost".to_string()))
        }
    }
}

impl CacheConnection for InMemoryConnection<'_> {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;
        Ok(self.cache.read(key))
    }

    fn set_with_ttl(&mut self, key: &str, payload: &[u8], ttl: Duration) -> Result<()> {
        self.ensure_available()?;
        self.cache.insert_raw(key, payload, ttl);
        self.cache.counters.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for InMemoryConnection<'_> {
    fn drop(&mut self) {
        self.cache
            .counters
            .open_connections
            .fetch_sub(1, Ordering::SeqCst);
    }
}
