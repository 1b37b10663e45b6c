use std::{path::Path, sync::Arc};

use chrono::{Local, NaiveTime};
use qeats_store::{InMemoryStore, Location, RestaurantStore, TestDataConfig};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    cache::{CachePool, InMemoryCache},
    config::SearchConfig,
    deadline::Deadline,
    error::QeatsError,
    index::{CacheKeyPolicy, GeoIndex},
    search::{ExecutionMode, SearchOrchestrator, SearchRequest, SearchResult},
};

/// Entry point for restaurant search.
///
/// Holds the cache-aside geo index for "everything near me" lookups and the
/// orchestrator for free-text search. Both share one store. Coordinates are
/// validated before any store or cache access.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveTime;
/// use qeats::{RestaurantSearcher, SearchConfig};
/// use qeats_store::TestDataConfig;
///
/// let searcher = RestaurantSearcher::from_test_data(&TestDataConfig::minimal(), SearchConfig::default())?;
/// let nine_am = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
///
/// let nearby = searcher.all_nearby(12.9, 77.6, nine_am)?;
/// let curries = searcher.by_search_text(12.9, 77.6, nine_am, "Indian")?;
/// println!("{} nearby, {} matching", nearby.len(), curries.len());
/// # Ok::<(), qeats::error::QeatsError>(())
/// ```
pub struct RestaurantSearcher<S, C = InMemoryCache> {
    index: GeoIndex<S, C>,
    orchestrator: SearchOrchestrator<S>,
    config: SearchConfig,
}

impl<S, C: std::fmt::Debug> std::fmt::Debug for RestaurantSearcher<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestaurantSearcher")
            .field("index", &self.index)
            .field("orchestrator", &self.orchestrator)
            .field("config", &self.config)
            .finish()
    }
}

impl<S: RestaurantStore, C: CachePool> RestaurantSearcher<S, C> {
    /// Create a searcher over `store`, caching nearby lists in `cache`.
    ///
    /// Starts the text search worker pool, which lives as long as the searcher.
    #[instrument(name = "Create RestaurantSearcher", level = "info", skip_all)]
    pub fn new(store: Arc<S>, cache: C, config: SearchConfig) -> Result<Self, QeatsError> {
        let t_init = std::time::Instant::now();

        let index = GeoIndex::new(Arc::clone(&store), cache, config.index_params());
        let orchestrator = SearchOrchestrator::new(store)?;

        info!(
            mode = ?config.execution_mode,
            key_policy = ?config.cache_key_policy,
            elapsed = ?t_init.elapsed(),
            "RestaurantSearcher ready"
        );
        Ok(Self {
            index,
            orchestrator,
            config,
        })
    }

    pub fn with_defaults(store: Arc<S>, cache: C) -> Result<Self, QeatsError> {
        Self::new(store, cache, SearchConfig::default())
    }

    /// Serving radius at `current_time`, in kilometres.
    pub fn radius_for(&self, current_time: NaiveTime) -> f64 {
        self.config.serving_policy.radius_for(current_time)
    }

    // === Proximity ===

    /// Every restaurant open at `current_time` within the serving radius.
    pub fn all_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        current_time: NaiveTime,
    ) -> Result<Vec<SearchResult>, QeatsError> {
        self.all_nearby_within(latitude, longitude, current_time, self.default_deadline())
    }

    /// [`all_nearby`](Self::all_nearby) at the local wall-clock time.
    pub fn all_nearby_now(&self, latitude: f64, longitude: f64) -> Result<Vec<SearchResult>, QeatsError> {
        self.all_nearby(latitude, longitude, Local::now().time())
    }

    #[instrument(name = "All Nearby", level = "info", skip(self, deadline))]
    pub fn all_nearby_within(
        &self,
        latitude: f64,
        longitude: f64,
        current_time: NaiveTime,
        deadline: Deadline,
    ) -> Result<Vec<SearchResult>, QeatsError> {
        let requester = Location::new(latitude, longitude)?;
        let radius_km = self.radius_for(current_time);
        let results = self
            .index
            .find_nearby(&requester, current_time, radius_km, &deadline)?;
        Ok(self.cap(results))
    }

    // === Text search ===

    /// Restaurants near the requester matching `search_text` by name, cuisine,
    /// menu item attribute or menu item name, in the configured mode.
    pub fn by_search_text(
        &self,
        latitude: f64,
        longitude: f64,
        current_time: NaiveTime,
        search_text: &str,
    ) -> Result<Vec<SearchResult>, QeatsError> {
        self.by_search_text_with_mode(
            latitude,
            longitude,
            current_time,
            search_text,
            self.config.execution_mode,
        )
    }

    pub fn by_search_text_with_mode(
        &self,
        latitude: f64,
        longitude: f64,
        current_time: NaiveTime,
        search_text: &str,
        mode: ExecutionMode,
    ) -> Result<Vec<SearchResult>, QeatsError> {
        self.by_search_text_within(
            latitude,
            longitude,
            current_time,
            search_text,
            mode,
            self.default_deadline(),
        )
    }

    /// [`by_search_text`](Self::by_search_text) at the local wall-clock time.
    pub fn by_search_text_now(
        &self,
        latitude: f64,
        longitude: f64,
        search_text: &str,
    ) -> Result<Vec<SearchResult>, QeatsError> {
        self.by_search_text(latitude, longitude, Local::now().time(), search_text)
    }

    #[instrument(name = "Search By Text", level = "info", skip(self, deadline))]
    pub fn by_search_text_within(
        &self,
        latitude: f64,
        longitude: f64,
        current_time: NaiveTime,
        search_text: &str,
        mode: ExecutionMode,
        deadline: Deadline,
    ) -> Result<Vec<SearchResult>, QeatsError> {
        let requester = Location::new(latitude, longitude)?;
        let radius_km = self.radius_for(current_time);
        let request = SearchRequest::new(requester, current_time, radius_km, search_text)
            .with_deadline(deadline);
        let results = self.orchestrator.search(&request, mode)?;
        Ok(self.cap(results))
    }

    // === Introspection ===

    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub const fn cache(&self) -> &C {
        self.index.cache()
    }

    /// Get information about the searcher configuration.
    pub fn info(&self) -> SearcherInfo {
        let policy = &self.config.serving_policy;
        SearcherInfo {
            execution_mode: self.config.execution_mode,
            cache_key_policy: self.config.cache_key_policy,
            bucket_precision: self.config.bucket_precision.get(),
            cache_ttl_secs: self.config.cache_ttl.as_secs(),
            peak_windows: policy.peak_windows().iter().map(ToString::to_string).collect(),
            peak_radius_km: policy.peak_radius_km(),
            normal_radius_km: policy.normal_radius_km(),
            max_results: self.config.max_results,
            request_timeout_ms: self
                .config
                .request_timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            workers: self.orchestrator.workers(),
        }
    }

    /// Stop the worker pool. Dropping the searcher has the same effect.
    pub fn shutdown(self) {
        info!("Shutting down RestaurantSearcher");
        self.orchestrator.shutdown();
    }

    fn default_deadline(&self) -> Deadline {
        Deadline::from_timeout(self.config.request_timeout)
    }

    fn cap(&self, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
        if let Some(limit) = self.config.max_results {
            results.truncate(limit);
        }
        results
    }
}

impl RestaurantSearcher<InMemoryStore, InMemoryCache> {
    /// Searcher over `restaurants.json` and `menus.json` in `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>, config: SearchConfig) -> Result<Self, QeatsError> {
        let store = InMemoryStore::load_from_dir(dir)?;
        Self::new(Arc::new(store), InMemoryCache::new(), config)
    }

    /// Searcher over the data in [`qeats_store::DATA_DIR`].
    pub fn load_default(config: SearchConfig) -> Result<Self, QeatsError> {
        Self::load_from_dir(qeats_store::DATA_DIR.as_path(), config)
    }

    /// Searcher over generated fixture data.
    pub fn from_test_data(data: &TestDataConfig, config: SearchConfig) -> Result<Self, QeatsError> {
        let store = InMemoryStore::from_test_data(data)?;
        Self::new(Arc::new(store), InMemoryCache::new(), config)
    }
}

/// Information about a [`RestaurantSearcher`]'s configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearcherInfo {
    pub execution_mode: ExecutionMode,
    pub cache_key_policy: CacheKeyPolicy,
    pub bucket_precision: u8,
    pub cache_ttl_secs: u64,
    pub peak_windows: Vec<String>,
    pub peak_radius_km: f64,
    pub normal_radius_km: f64,
    pub max_results: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub workers: usize,
}

impl SearcherInfo {
    /// Get a human-readable summary of the searcher.
    pub fn summary(&self) -> String {
        format!(
            "RestaurantSearcher ({:?}, {:?} keys at precision {}) serving {} km at peak [{}] and {} km otherwise",
            self.execution_mode,
            self.cache_key_policy,
            self.bucket_precision,
            self.peak_radius_km,
            self.peak_windows.join(", "),
            self.normal_radius_km,
        )
    }
}
