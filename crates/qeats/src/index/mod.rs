//! Cache-aside index of nearby open restaurants.
//!
//! Lists are cached per geohash bucket. A hit is served verbatim; a miss scans
//! the store, filters for the caller, and writes the fresh list back. The cache
//! is an accelerator only: every cache failure is logged and treated as a miss.

use std::{sync::Arc, time::Duration};

use chrono::NaiveTime;
use qeats_store::{Location, RestaurantStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    cache::{self, CacheConnection, CachePool, DEFAULT_TTL},
    deadline::Deadline,
    geo::{self, BucketPrecision},
    search::{Result, SearchResult, is_eligible},
};

/// What a cache entry is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyPolicy {
    /// Geohash bucket only. Callers in one bucket share a list regardless of
    /// the radius it was computed for.
    BucketOnly,
    /// Geohash bucket plus the serving radius, so peak and off-peak lists
    /// never overwrite each other.
    #[default]
    BucketAndRadiusClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoIndexParams {
    pub precision: BucketPrecision,
    pub ttl: Duration,
    pub key_policy: CacheKeyPolicy,
}

impl Default for GeoIndexParams {
    fn default() -> Self {
        Self {
            precision: BucketPrecision::default(),
            ttl: DEFAULT_TTL,
            key_policy: CacheKeyPolicy::default(),
        }
    }
}

pub struct GeoIndex<S, C> {
    store: Arc<S>,
    cache: C,
    params: GeoIndexParams,
}

impl<S, C: std::fmt::Debug> std::fmt::Debug for GeoIndex<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoIndex")
            .field("cache", &self.cache)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<S: RestaurantStore, C: CachePool> GeoIndex<S, C> {
    pub const fn new(store: Arc<S>, cache: C, params: GeoIndexParams) -> Self {
        Self {
            store,
            cache,
            params,
        }
    }

    pub fn cache_key(&self, requester: &Location, radius_km: f64) -> String {
        let bucket = geo::encode(requester, self.params.precision);
        match self.params.key_policy {
            CacheKeyPolicy::BucketOnly => bucket.to_string(),
            CacheKeyPolicy::BucketAndRadiusClass => bucket.with_radius_class(radius_km),
        }
    }

    /// Open restaurants strictly within `radius_km` of `requester`.
    ///
    /// Only store failures and an expired deadline reach the caller.
    #[instrument(
        name = "Nearby Lookup",
        level = "debug",
        skip_all,
        fields(radius_km = radius_km, time = %current_time)
    )]
    pub fn find_nearby(
        &self,
        requester: &Location,
        current_time: NaiveTime,
        radius_km: f64,
        deadline: &Deadline,
    ) -> Result<Vec<SearchResult>> {
        deadline.check("cache read")?;
        let key = self.cache_key(requester, radius_km);

        let mut connection = match self.cache.acquire() {
            Ok(connection) => Some(connection),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache unavailable, reading through to store");
                None
            }
        };

        if let Some(cached) = connection.as_mut().and_then(|conn| read_cached(conn, &key)) {
            debug!(key = %key, results = cached.len(), "Cache hit");
            return Ok(cached);
        }
        debug!(key = %key, "Cache miss");

        deadline.check("store scan")?;
        let t_scan = std::time::Instant::now();
        let restaurants = self.store.find_all()?;
        let scanned = restaurants.len();
        let fresh: Vec<SearchResult> = restaurants
            .into_iter()
            .filter(|record| is_eligible(record, requester, current_time, radius_km))
            .map(SearchResult::from)
            .collect();
        debug!(
            scanned,
            results = fresh.len(),
            elapsed_ms = t_scan.elapsed().as_millis(),
            "Store scan complete"
        );

        if let Some(conn) = connection.as_mut() {
            write_cached(conn, &key, &fresh, self.params.ttl);
        }
        Ok(fresh)
    }

    pub const fn params(&self) -> &GeoIndexParams {
        &self.params
    }

    pub const fn cache(&self) -> &C {
        &self.cache
    }
}

fn read_cached<Conn: CacheConnection>(conn: &mut Conn, key: &str) -> Option<Vec<SearchResult>> {
    let payload = match conn.get(key) {
        Ok(payload) => payload?,
        Err(e) => {
            warn!(key, error = %e, "Cache read failed, treating as miss");
            return None;
        }
    };
    match cache::decode_results(&payload) {
        Ok(results) => Some(results),
        Err(e) => {
            warn!(key, error = %e, "Malformed cache payload, recomputing");
            None
        }
    }
}

fn write_cached<Conn: CacheConnection>(
    conn: &mut Conn,
    key: &str,
    results: &[SearchResult],
    ttl: Duration,
) {
    let written = cache::encode_results(results).and_then(|payload| conn.set_with_ttl(key, &payload, ttl));
    if let Err(e) = written {
        warn!(key, error = %e, "Cache write failed");
    }
}
