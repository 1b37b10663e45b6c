//! Integration tests for QEats restaurant search
//!
//! These tests drive the public API end to end against the in-memory store and
//! cache, including stores that fail or panic on purpose.

use std::{
    collections::BTreeSet,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::NaiveTime;
use qeats::{
    BucketPrecision, CacheKeyPolicy, Deadline, ExecutionMode, InMemoryCache, QeatsError,
    RestaurantSearcher, SearchConfig, SearchConfigBuilder, SearchError, SearchResult, SubQuery,
    SubQueryError, geo,
};
use qeats_store::{
    InMemoryStore, ItemRecord, Location, MenuRecord, RestaurantRecord, RestaurantStore,
    StoreError, TestDataConfig,
    test_data::{self, offset_location},
};

fn setup_test_env() {
    let _ = qeats::init_logging(tracing::Level::WARN);
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn center() -> Location {
    Location::new(test_data::CENTER.0, test_data::CENTER.1).unwrap()
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.restaurant_id.as_str()).collect()
}

fn id_set(results: &[SearchResult]) -> BTreeSet<String> {
    results.iter().map(|r| r.restaurant_id.clone()).collect()
}

fn search_error(err: QeatsError) -> SearchError {
    match err {
        QeatsError::SearchError(e) => e,
        other => panic!("expected a search error, got {other}"),
    }
}

/// One restaurant 2 km north and one 4 km north of the centre, open 08:00-22:00.
fn two_and_four_km_store() -> Arc<InMemoryStore> {
    let here = center();
    let restaurants = vec![
        RestaurantRecord::new("r-2km", "Two K", offset_location(here, 2.0, 0.0), at(8, 0), at(22, 0)),
        RestaurantRecord::new("r-4km", "Four K", offset_location(here, 4.0, 0.0), at(8, 0), at(22, 0)),
    ];
    Arc::new(InMemoryStore::new(restaurants, Vec::new()).unwrap())
}

fn fixture_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_test_data(&TestDataConfig::minimal()).unwrap())
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Unavailable,
    Panic,
}

/// Wraps the fixture store and breaks a single method.
#[derive(Debug)]
struct FaultyStore {
    inner: InMemoryStore,
    method: &'static str,
    fault: Fault,
}

impl FaultyStore {
    fn new(method: &'static str, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStore::from_test_data(&TestDataConfig::minimal()).unwrap(),
            method,
            fault,
        })
    }

    fn enter(&self, method: &str) -> qeats_store::Result<()> {
        if method != self.method {
            return Ok(());
        }
        match self.fault {
            Fault::Unavailable => Err(StoreError::Unavailable(format!("{method} is down"))),
            Fault::Panic => panic!("{method} exploded"),
        }
    }
}

impl RestaurantStore for FaultyStore {
    fn find_all(&self) -> qeats_store::Result<Vec<RestaurantRecord>> {
        self.enter("find_all")?;
        self.inner.find_all()
    }

    fn find_by_name_exact(&self, name: &str) -> qeats_store::Result<Vec<RestaurantRecord>> {
        self.enter("find_by_name_exact")?;
        self.inner.find_by_name_exact(name)
    }

    fn find_by_attributes(&self, text: &str) -> qeats_store::Result<Vec<RestaurantRecord>> {
        self.enter("find_by_attributes")?;
        self.inner.find_by_attributes(text)
    }

    fn find_menus_by_item_name(&self, text: &str) -> qeats_store::Result<Vec<MenuRecord>> {
        self.enter("find_menus_by_item_name")?;
        self.inner.find_menus_by_item_name(text)
    }

    fn find_items_by_attributes(&self, text: &str) -> qeats_store::Result<Vec<ItemRecord>> {
        self.enter("find_items_by_attributes")?;
        self.inner.find_items_by_attributes(text)
    }

    fn find_menus_by_item_ids(&self, item_ids: &[String]) -> qeats_store::Result<Vec<MenuRecord>> {
        self.enter("find_menus_by_item_ids")?;
        self.inner.find_menus_by_item_ids(item_ids)
    }

    fn find_by_id(&self, restaurant_id: &str) -> qeats_store::Result<Option<RestaurantRecord>> {
        self.enter("find_by_id")?;
        self.inner.find_by_id(restaurant_id)
    }
}

#[test]
fn test_only_the_closer_restaurant_at_nine() {
    setup_test_env();
    let searcher = RestaurantSearcher::with_defaults(two_and_four_km_store(), InMemoryCache::new())
        .expect("Should create searcher");

    let results = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    assert_eq!(ids(&results), ["r-2km"]);

    // Off-peak the radius is 5 km and both qualify.
    let results = searcher.all_nearby(12.9, 77.6, at(11, 0)).unwrap();
    assert_eq!(ids(&results), ["r-2km", "r-4km"]);
}

#[test]
fn test_peak_boundary_through_the_facade() {
    setup_test_env();
    let searcher = RestaurantSearcher::with_defaults(two_and_four_km_store(), InMemoryCache::new())
        .unwrap();

    assert_eq!(ids(&searcher.all_nearby(12.9, 77.6, at(10, 0)).unwrap()), ["r-2km"]);
    assert_eq!(
        ids(&searcher.all_nearby(12.9, 77.6, at(10, 1)).unwrap()),
        ["r-2km", "r-4km"]
    );
    assert_eq!(ids(&searcher.all_nearby(12.9, 77.6, at(21, 0)).unwrap()), ["r-2km"]);
}

#[test]
fn test_opening_minute_is_excluded() {
    setup_test_env();
    let restaurants = vec![RestaurantRecord::new(
        "r-opens-nine",
        "Opens At Nine",
        offset_location(center(), 0.5, 0.0),
        at(9, 0),
        at(17, 0),
    )];
    let store = Arc::new(InMemoryStore::new(restaurants, Vec::new()).unwrap());
    let searcher = RestaurantSearcher::with_defaults(store, InMemoryCache::new()).unwrap();

    let opening = searcher
        .by_search_text(12.9, 77.6, at(9, 0), "Opens At Nine")
        .unwrap();
    assert!(opening.is_empty());

    let a_minute_later = searcher
        .by_search_text(12.9, 77.6, at(9, 1), "Opens At Nine")
        .unwrap();
    assert_eq!(ids(&a_minute_later), ["r-opens-nine"]);
}

#[test]
fn test_nearby_lists_are_served_from_cache() {
    setup_test_env();
    let store = two_and_four_km_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();

    let first = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    let second = searcher.all_nearby(12.9, 77.6, at(9, 30)).unwrap();
    assert_eq!(first, second);
    assert_eq!(store.call_count(), 1);

    let stats = searcher.cache().stats();
    assert_eq!((stats.hits, stats.misses, stats.writes), (1, 1, 1));
}

#[test]
fn test_requesters_in_one_bucket_share_an_entry() {
    setup_test_env();
    let store = two_and_four_km_store();
    let cache = Arc::new(InMemoryCache::new());
    let searcher = RestaurantSearcher::with_defaults(Arc::clone(&store), Arc::clone(&cache)).unwrap();

    // A couple of metres apart, same 7-character geohash cell.
    searcher.all_nearby(12.90001, 77.60001, at(9, 0)).unwrap();
    searcher.all_nearby(12.90002, 77.60002, at(9, 0)).unwrap();
    assert_eq!(store.call_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_bucket_only_keys_share_one_list_across_radii() {
    setup_test_env();
    let store = two_and_four_km_store();
    let config = SearchConfigBuilder::new()
        .cache_key_policy(CacheKeyPolicy::BucketOnly)
        .build();
    let searcher = RestaurantSearcher::new(Arc::clone(&store), InMemoryCache::new(), config).unwrap();

    let peak = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    let off_peak = searcher.all_nearby(12.9, 77.6, at(11, 0)).unwrap();
    assert_eq!(ids(&peak), ["r-2km"]);
    assert_eq!(off_peak, peak, "bucket-only keys ignore the radius");
    assert_eq!(store.call_count(), 1);
}

#[test]
fn test_radius_class_keys_separate_peak_and_off_peak() {
    setup_test_env();
    let store = two_and_four_km_store();
    let config = SearchConfigBuilder::new()
        .cache_key_policy(CacheKeyPolicy::BucketAndRadiusClass)
        .build();
    let searcher = RestaurantSearcher::new(Arc::clone(&store), InMemoryCache::new(), config).unwrap();

    let peak = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    let off_peak = searcher.all_nearby(12.9, 77.6, at(11, 0)).unwrap();
    assert_eq!(ids(&peak), ["r-2km"]);
    assert_eq!(ids(&off_peak), ["r-2km", "r-4km"]);
    assert_eq!(store.call_count(), 2);
    assert_eq!(searcher.cache().len(), 2);
}

#[test]
fn test_cache_outage_degrades_to_misses() {
    setup_test_env();
    let store = two_and_four_km_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();
    searcher.cache().set_available(false);

    for _ in 0..3 {
        let results = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
        assert_eq!(ids(&results), ["r-2km"]);
    }
    assert_eq!(store.call_count(), 3);

    searcher.cache().set_available(true);
    searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    assert_eq!(store.call_count(), 4, "cache recovers once it is back");
}

#[test]
fn test_malformed_payload_is_recomputed() {
    setup_test_env();
    let store = two_and_four_km_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();

    let key = geo::encode(&center(), BucketPrecision::default()).with_radius_class(3.0);
    searcher
        .cache()
        .insert_raw(key, b"{\"definitely\": \"not a list\"}".to_vec(), Duration::from_secs(600));

    let results = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    assert_eq!(ids(&results), ["r-2km"]);
    assert_eq!(store.call_count(), 1);

    let again = searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    assert_eq!(again, results);
    assert_eq!(store.call_count(), 1, "recomputed list replaced the bad payload");
}

#[test]
fn test_expired_entries_are_recomputed() {
    setup_test_env();
    let store = two_and_four_km_store();
    let config = SearchConfigBuilder::new().cache_ttl(Duration::ZERO).build();
    let searcher = RestaurantSearcher::new(Arc::clone(&store), InMemoryCache::new(), config).unwrap();

    searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap();
    assert_eq!(store.call_count(), 2);
}

#[test]
fn test_store_outage_surfaces_and_releases_cache_handles() {
    setup_test_env();
    let store = two_and_four_km_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();
    store.set_available(false);

    let err = search_error(searcher.all_nearby(12.9, 77.6, at(9, 0)).unwrap_err());
    assert!(err.is_store_unavailable());
    assert_eq!(searcher.cache().stats().open_connections, 0);
    assert!(searcher.cache().is_empty());

    let err = search_error(
        searcher
            .by_search_text(12.9, 77.6, at(9, 0), "Two K")
            .unwrap_err(),
    );
    assert!(err.is_store_unavailable());
    assert_eq!(searcher.cache().stats().open_connections, 0);
}

#[test]
fn test_restaurant_found_by_two_sub_queries_appears_once() {
    setup_test_env();
    let searcher = RestaurantSearcher::with_defaults(fixture_store(), InMemoryCache::new()).unwrap();

    for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
        let results = searcher
            .by_search_text_with_mode(12.9, 77.6, at(19, 30), "Tandoor", mode)
            .unwrap();
        assert_eq!(ids(&results), [test_data::LATE_NIGHT_TANDOOR]);
    }
}

#[test]
fn test_shared_item_resolves_every_owner() {
    setup_test_env();
    let searcher = RestaurantSearcher::with_defaults(fixture_store(), InMemoryCache::new()).unwrap();

    // Butter Naan is on two menus; both restaurants are open at 19:30.
    let results = searcher
        .by_search_text(12.9, 77.6, at(19, 30), "Butter Naan")
        .unwrap();
    assert_eq!(
        ids(&results),
        [test_data::SPICE_GARDEN, test_data::LATE_NIGHT_TANDOOR]
    );
}

#[test]
fn test_modes_are_set_equal_on_sample_data() {
    setup_test_env();
    let store = Arc::new(InMemoryStore::from_test_data(&TestDataConfig::sample()).unwrap());
    let searcher = RestaurantSearcher::with_defaults(store, InMemoryCache::new()).unwrap();

    let queries = ["Indian", "Vegetarian", "Spicy", "Cafe", "Kitchen 7", "Coffee", "Sweet"];
    for time in [at(9, 0), at(12, 30), at(16, 0), at(20, 0)] {
        for query in queries {
            let sequential = searcher
                .by_search_text_with_mode(12.9, 77.6, time, query, ExecutionMode::Sequential)
                .unwrap();
            let concurrent = searcher
                .by_search_text_with_mode(12.9, 77.6, time, query, ExecutionMode::Concurrent)
                .unwrap();
            assert_eq!(
                id_set(&sequential),
                id_set(&concurrent),
                "modes disagree for {query} at {time}"
            );
            assert_eq!(id_set(&sequential).len(), sequential.len(), "duplicates for {query}");
        }
    }
}

#[test]
fn test_blank_query_touches_neither_store_nor_cache() {
    setup_test_env();
    let store = fixture_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();

    for text in ["", " ", "\t  \n"] {
        assert!(searcher.by_search_text(12.9, 77.6, at(12, 0), text).unwrap().is_empty());
    }
    assert_eq!(store.call_count(), 0);
    assert_eq!(searcher.cache().stats(), qeats::CacheStats::default());
}

#[test]
fn test_failing_sub_query_fails_the_search() {
    setup_test_env();
    let store = FaultyStore::new("find_items_by_attributes", Fault::Unavailable);
    let searcher = RestaurantSearcher::with_defaults(store, InMemoryCache::new()).unwrap();

    for mode in [ExecutionMode::Concurrent, ExecutionMode::Sequential] {
        let err = searcher
            .by_search_text_with_mode(12.9, 77.6, at(12, 0), "Indian", mode)
            .unwrap_err();
        let message = err.to_string();
        let err = search_error(err);
        assert_eq!(err.failed_sub_queries(), vec![SubQuery::ItemAttributes]);
        assert!(err.is_store_unavailable());
        assert!(message.contains("item attributes"), "{message}");
        assert!(message.contains("find_items_by_attributes is down"), "{message}");
    }
}

#[test]
fn test_failure_in_owner_lookup_is_attributed() {
    setup_test_env();
    let store = FaultyStore::new("find_by_id", Fault::Unavailable);
    let searcher = RestaurantSearcher::with_defaults(store, InMemoryCache::new()).unwrap();

    // Both menu-based sub-queries resolve owners by id; "Naan" hits both.
    let err = search_error(
        searcher
            .by_search_text(12.9, 77.6, at(12, 0), "Naan")
            .unwrap_err(),
    );
    assert_eq!(err.failed_sub_queries(), vec![SubQuery::ItemName]);

    let err = search_error(
        searcher
            .by_search_text(12.9, 77.6, at(12, 0), "Vegetarian")
            .unwrap_err(),
    );
    assert_eq!(err.failed_sub_queries(), vec![SubQuery::ItemAttributes]);
}

#[test]
fn test_panicking_sub_query_is_reported_not_propagated() {
    setup_test_env();
    let store = FaultyStore::new("find_menus_by_item_name", Fault::Panic);
    let searcher = RestaurantSearcher::with_defaults(store, InMemoryCache::new()).unwrap();

    let err = search_error(
        searcher
            .by_search_text(12.9, 77.6, at(12, 0), "Indian")
            .unwrap_err(),
    );
    let SearchError::SubQueriesFailed(failures) = &err else {
        panic!("expected aggregate failure, got {err}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].query, SubQuery::ItemName);
    assert!(
        matches!(&failures[0].error, SubQueryError::Panicked(msg) if msg.contains("exploded"))
    );

    // The worker pool survives and keeps serving.
    let nearby = searcher.all_nearby(12.9, 77.6, at(12, 0)).unwrap();
    assert!(!nearby.is_empty());
}

#[test]
fn test_expired_deadline_fails_both_paths() {
    setup_test_env();
    let store = fixture_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();
    let expired = Deadline::at(Instant::now());

    let err = search_error(
        searcher
            .all_nearby_within(12.9, 77.6, at(12, 0), expired)
            .unwrap_err(),
    );
    assert!(matches!(err, SearchError::DeadlineExceeded(_)));

    let err = search_error(
        searcher
            .by_search_text_within(12.9, 77.6, at(12, 0), "Indian", ExecutionMode::Concurrent, expired)
            .unwrap_err(),
    );
    assert!(matches!(err, SearchError::DeadlineExceeded(_)));
    assert_eq!(store.call_count(), 0);
    assert_eq!(searcher.cache().stats().open_connections, 0);

    // A generous deadline changes nothing.
    let generous = Deadline::after(Duration::from_secs(60));
    let within = searcher
        .by_search_text_within(12.9, 77.6, at(12, 0), "Indian", ExecutionMode::Concurrent, generous)
        .unwrap();
    let unbounded = searcher.by_search_text(12.9, 77.6, at(12, 0), "Indian").unwrap();
    assert_eq!(within, unbounded);
}

#[test]
fn test_invalid_location_rejected() {
    setup_test_env();
    let store = fixture_store();
    let searcher =
        RestaurantSearcher::with_defaults(Arc::clone(&store), InMemoryCache::new()).unwrap();

    let err = search_error(searcher.all_nearby(-91.0, 0.0, at(12, 0)).unwrap_err());
    assert!(err.is_invalid_location());
    let err = search_error(
        searcher
            .by_search_text(0.0, 181.0, at(12, 0), "Indian")
            .unwrap_err(),
    );
    assert!(err.is_invalid_location());
    assert_eq!(store.call_count(), 0);
}

#[test]
fn test_load_from_directory() {
    setup_test_env();
    let dir = tempfile::TempDir::new().unwrap();
    let config = TestDataConfig::minimal();
    std::fs::write(
        dir.path().join("restaurants.json"),
        serde_json::to_vec(&test_data::sample_restaurants(&config)).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("menus.json"),
        serde_json::to_vec(&test_data::sample_menus(&config)).unwrap(),
    )
    .unwrap();

    let searcher = RestaurantSearcher::load_from_dir(dir.path(), SearchConfig::default()).unwrap();
    let results = searcher.by_search_text(12.9, 77.6, at(12, 0), "Margherita").unwrap();
    assert_eq!(ids(&results), [test_data::PIZZA_PIAZZA]);
}

#[test]
fn test_missing_data_directory_is_a_store_error() {
    setup_test_env();
    let dir = tempfile::TempDir::new().unwrap();
    let err = RestaurantSearcher::load_from_dir(dir.path().join("nope"), SearchConfig::default())
        .unwrap_err();
    assert!(matches!(err, QeatsError::Store(StoreError::RequiredFileNotFound(_))));
}

#[test]
fn test_concurrent_callers_share_one_searcher() {
    setup_test_env();
    let store = Arc::new(InMemoryStore::from_test_data(&TestDataConfig::sample()).unwrap());
    let searcher = Arc::new(RestaurantSearcher::with_defaults(store, InMemoryCache::new()).unwrap());
    let expected = id_set(&searcher.by_search_text(12.9, 77.6, at(12, 30), "Vegetarian").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let searcher = Arc::clone(&searcher);
            std::thread::spawn(move || {
                let text = searcher
                    .by_search_text(12.9, 77.6, at(12, 30), "Vegetarian")
                    .unwrap();
                let nearby = searcher.all_nearby(12.9, 77.6, at(12, 30)).unwrap();
                (id_set(&text), nearby.len())
            })
        })
        .collect();

    let mut nearby_sizes = BTreeSet::new();
    for handle in handles {
        let (text, nearby) = handle.join().unwrap();
        assert_eq!(text, expected);
        nearby_sizes.insert(nearby);
    }
    assert_eq!(nearby_sizes.len(), 1, "every caller saw the same nearby list");
    assert_eq!(searcher.cache().stats().open_connections, 0);
}
