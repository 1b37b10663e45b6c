use std::time::Duration;

use qeats_store::parse_time_of_day;

use crate::{
    cache::DEFAULT_TTL,
    error::QeatsError,
    geo::BucketPrecision,
    index::{CacheKeyPolicy, GeoIndexParams},
    policy::{self, PeakWindow, PolicyError, ServingPolicy},
    search::ExecutionMode,
};

/// Settings for a [`RestaurantSearcher`](crate::RestaurantSearcher).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Geohash length of cache keys.
    pub bucket_precision: BucketPrecision,
    /// Lifetime of a cached nearby list.
    pub cache_ttl: Duration,
    pub cache_key_policy: CacheKeyPolicy,
    /// Default mode for text searches.
    pub execution_mode: ExecutionMode,
    /// Truncate results to this many entries. `None` returns everything.
    pub max_results: Option<usize>,
    /// Deadline applied to calls that do not bring their own.
    pub request_timeout: Option<Duration>,
    pub serving_policy: ServingPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bucket_precision: BucketPrecision::default(),
            cache_ttl: DEFAULT_TTL,
            cache_key_policy: CacheKeyPolicy::default(),
            execution_mode: ExecutionMode::default(),
            max_results: None,
            request_timeout: None,
            serving_policy: ServingPolicy::default(),
        }
    }
}

impl SearchConfig {
    pub(crate) const fn index_params(&self) -> GeoIndexParams {
        GeoIndexParams {
            precision: self.bucket_precision,
            ttl: self.cache_ttl,
            key_policy: self.cache_key_policy,
        }
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Run text sub-queries one after another on the calling thread
    pub fn sequential() -> Self {
        let mut builder = Self::new();
        builder.config.execution_mode = ExecutionMode::Sequential;
        builder
    }

    /// Reproduce the legacy service: bucket-only cache keys and sequential
    /// text search
    pub fn original() -> Self {
        let mut builder = Self::sequential();
        builder.config.cache_key_policy = CacheKeyPolicy::BucketOnly;
        builder
    }

    /// Set the geohash length of cache keys, 1..=12
    pub fn bucket_precision(mut self, chars: u8) -> Result<Self, QeatsError> {
        self.config.bucket_precision =
            BucketPrecision::new(chars).map_err(|e| QeatsError::ConfigError(e.to_string()))?;
        Ok(self)
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn cache_key_policy(mut self, policy: CacheKeyPolicy) -> Self {
        self.config.cache_key_policy = policy;
        self
    }

    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.config.execution_mode = mode;
        self
    }

    /// Cap the number of results returned from every search
    pub fn max_results(mut self, limit: usize) -> Self {
        self.config.max_results = Some(limit);
        self
    }

    /// Fail calls that take longer than `timeout`
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Configure peak windows and serving radii
    pub fn serving(self) -> ServingPolicyBuilder {
        ServingPolicyBuilder::new(self)
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }
}

/// Builder for the serving policy
pub struct ServingPolicyBuilder {
    parent: SearchConfigBuilder,
}

impl ServingPolicyBuilder {
    const fn new(parent: SearchConfigBuilder) -> Self {
        Self { parent }
    }

    /// Drop all peak windows, so the normal radius applies all day
    pub fn clear_peak_windows(mut self) -> Self {
        self.parent.config.serving_policy.peak_windows.clear();
        self
    }

    /// Add a peak window from `HH:MM` strings, both ends inclusive
    pub fn peak_window(mut self, start: &str, end: &str) -> Result<Self, QeatsError> {
        let parse = |raw: &str| {
            parse_time_of_day(raw).ok_or_else(|| PolicyError::InvalidTime(raw.to_string()))
        };
        let window = parse(start)
            .and_then(|start| PeakWindow::new(start, parse(end)?))
            .map_err(|e| QeatsError::ConfigError(e.to_string()))?;
        self.parent.config.serving_policy.peak_windows.push(window);
        Ok(self)
    }

    /// Set the peak and normal serving radii in kilometres
    pub fn radii(mut self, peak_km: f64, normal_km: f64) -> Result<Self, QeatsError> {
        for radius in [peak_km, normal_km] {
            policy::validate_radius(radius)
                .map_err(|e| QeatsError::ConfigError(e.to_string()))?;
        }
        if peak_km > normal_km {
            return Err(QeatsError::ConfigError(format!(
                "Peak radius {peak_km} km must not exceed normal radius {normal_km} km"
            )));
        }
        self.parent.config.serving_policy.peak_radius_km = peak_km;
        self.parent.config.serving_policy.normal_radius_km = normal_km;
        Ok(self)
    }

    /// Return to the main configuration builder
    pub fn done(self) -> SearchConfigBuilder {
        self.parent
    }
}
