//! QEats - Restaurant Proximity Search
//!
//! QEats answers two questions for a hungry user at a given place and time:
//! which restaurants nearby are open right now, and which of those match a
//! piece of free text (a restaurant name, a cuisine, a dish or a dish tag).
//!
//! # Quick Start
//!
//! ```rust
//! use chrono::NaiveTime;
//! use qeats::{RestaurantSearcher, SearchConfigBuilder};
//! use qeats_store::TestDataConfig;
//!
//! let config = SearchConfigBuilder::new().max_results(10).build();
//! let searcher = RestaurantSearcher::from_test_data(&TestDataConfig::minimal(), config)?;
//!
//! let lunch = NaiveTime::from_hms_opt(13, 30, 0).unwrap();
//! for restaurant in searcher.by_search_text(12.9, 77.6, lunch, "Spicy")? {
//!     println!("{} ({})", restaurant.name, restaurant.restaurant_id);
//! }
//! # Ok::<(), qeats::error::QeatsError>(())
//! ```
//!
//! # How it works
//!
//! - **Serving radius**: peak hours (breakfast, lunch and dinner rush) shrink
//!   the delivery radius from 5 km to 3 km.
//! - **Nearby lists** are cached per geohash bucket with a TTL. The cache is an
//!   accelerator only; when it misbehaves every lookup falls through to the
//!   store.
//! - **Text search** runs four store lookups, either one after another or in
//!   parallel on a small worker pool, and merges them without duplicates. If
//!   any lookup fails the whole search fails.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod cache;
mod config;
mod deadline;
pub mod error;
pub mod geo;
mod index;
mod policy;
mod search;
mod searcher;

pub use cache::{CacheConnection, CachePool, CacheStats, InMemoryCache};
pub use config::{SearchConfig, SearchConfigBuilder, ServingPolicyBuilder};
pub use deadline::{Deadline, DeadlineExceeded};
pub use error::QeatsError;
pub use geo::{BucketKey, BucketPrecision, GeoError};
pub use index::{CacheKeyPolicy, GeoIndex, GeoIndexParams};
pub use policy::{NORMAL_RADIUS_KM, PEAK_RADIUS_KM, PeakWindow, PolicyError, ServingPolicy};
pub use qeats_store as store;
pub use search::{
    DISPATCH_ORDER, ExecutionMode, FAN_OUT, SearchError, SearchOrchestrator, SearchRequest,
    SearchResult, SubQuery, SubQueryError, SubQueryFailure, is_eligible, is_open_at, merge_unique,
};
pub use searcher::{RestaurantSearcher, SearcherInfo};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the QEats library.
///
/// Sets up a `tracing` subscriber filtered by `RUST_LOG` when present,
/// otherwise by `level`. Safe to call more than once; only the first call
/// installs the subscriber.
///
/// # Examples
///
/// ```rust
/// use qeats::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), qeats::error::QeatsError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::QeatsError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("rayon_core=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
