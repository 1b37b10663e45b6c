//! An in-process implementation of [`RestaurantStore`].
//!
//! Holds the catalogue in insertion order and answers every query with a linear
//! scan, which is plenty for fixture-sized datasets. Name lookups are exact;
//! attribute and item-name lookups are case-insensitive substring matches.

use std::{
    fs::File,
    io::BufReader,
    path::Path,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::{
    DATA_DIR, Result, StoreError, TextMatcher,
    model::{ItemRecord, MenuRecord, RestaurantRecord},
    store::RestaurantStore,
    test_data::{self, TestDataConfig},
};

pub const RESTAURANTS_FILE: &str = "restaurants.json";
pub const MENUS_FILE: &str = "menus.json";

#[derive(Debug)]
pub struct InMemoryStore {
    restaurants: Vec<RestaurantRecord>,
    by_id: HashMap<String, usize>,
    menus: Vec<MenuRecord>,
    /// Distinct items across all menus, first occurrence wins.
    items: Vec<ItemRecord>,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new(restaurants: Vec<RestaurantRecord>, menus: Vec<MenuRecord>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(restaurants.len());
        for (idx, restaurant) in restaurants.iter().enumerate() {
            if by_id.insert(restaurant.restaurant_id.clone(), idx).is_some() {
                return Err(StoreError::DuplicateRestaurant(
                    restaurant.restaurant_id.clone(),
                ));
            }
        }

        let mut seen_items = HashSet::new();
        let items = menus
            .iter()
            .flat_map(|menu| menu.items.iter())
            .filter(|item| seen_items.insert(item.item_id.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            restaurants,
            by_id,
            menus,
            items,
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    /// Load `restaurants.json` and (optionally) `menus.json` from `dir`.
    #[instrument(name = "Load InMemoryStore", level = "info", skip_all, fields(dir = ?dir.as_ref()))]
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let menus_path = dir.join(MENUS_FILE);
        Self::load_from_files(
            dir.join(RESTAURANTS_FILE),
            menus_path.exists().then_some(menus_path),
        )
    }

    /// Load from the process-wide [`DATA_DIR`].
    pub fn load_default() -> Result<Self> {
        Self::load_from_dir(DATA_DIR.as_path())
    }

    pub fn load_from_files(
        restaurants_path: impl AsRef<Path>,
        menus_path: Option<impl AsRef<Path>>,
    ) -> Result<Self> {
        let restaurants: Vec<RestaurantRecord> = read_json(restaurants_path.as_ref())?;
        let menus: Vec<MenuRecord> = match menus_path {
            Some(path) => read_json(path.as_ref())?,
            None => Vec::new(),
        };
        info!(
            restaurants = restaurants.len(),
            menus = menus.len(),
            "Loaded restaurant catalogue"
        );
        Self::new(restaurants, menus)
    }

    /// Build a store populated with generated fixture data.
    pub fn from_test_data(config: &TestDataConfig) -> Result<Self> {
        Self::new(
            test_data::sample_restaurants(config),
            test_data::sample_menus(config),
        )
    }

    /// Simulate an outage: while unavailable every query fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of queries served (or refused) since creation or the last reset.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_call_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.restaurants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    fn begin_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store is marked unavailable".to_string(),
            ))
        }
    }

    fn restaurants_where<F>(&self, predicate: F) -> Vec<RestaurantRecord>
    where
        F: Fn(&RestaurantRecord) -> bool,
    {
        self.restaurants
            .iter()
            .filter(|restaurant| predicate(restaurant))
            .cloned()
            .collect()
    }

    fn menus_where<F>(&self, predicate: F) -> Vec<MenuRecord>
    where
        F: Fn(&ItemRecord) -> bool,
    {
        self.menus
            .iter()
            .filter(|menu| menu.items.iter().any(&predicate))
            .cloned()
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(StoreError::RequiredFileNotFound(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

impl RestaurantStore for InMemoryStore {
    fn find_all(&self) -> Result<Vec<RestaurantRecord>> {
        self.begin_call()?;
        Ok(self.restaurants.clone())
    }

    fn find_by_name_exact(&self, name: &str) -> Result<Vec<RestaurantRecord>> {
        self.begin_call()?;
        Ok(self.restaurants_where(|restaurant| restaurant.name == name))
    }

    fn find_by_attributes(&self, text: &str) -> Result<Vec<RestaurantRecord>> {
        self.begin_call()?;
        let matcher = TextMatcher::contains_ignore_case(text)?;
        Ok(self.restaurants_where(|restaurant| matcher.any_match(&restaurant.attributes)))
    }

    fn find_menus_by_item_name(&self, text: &str) -> Result<Vec<MenuRecord>> {
        self.begin_call()?;
        let matcher = TextMatcher::contains_ignore_case(text)?;
        Ok(self.menus_where(|item| matcher.is_match(&item.name)))
    }

    fn find_items_by_attributes(&self, text: &str) -> Result<Vec<ItemRecord>> {
        self.begin_call()?;
        let matcher = TextMatcher::contains_ignore_case(text)?;
        Ok(self
            .items
            .iter()
            .filter(|item| matcher.any_match(&item.attributes))
            .cloned()
            .collect())
    }

    fn find_menus_by_item_ids(&self, item_ids: &[String]) -> Result<Vec<MenuRecord>> {
        self.begin_call()?;
        let wanted: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
        Ok(self.menus_where(|item| wanted.contains(item.item_id.as_str())))
    }

    fn find_by_id(&self, restaurant_id: &str) -> Result<Option<RestaurantRecord>> {
        self.begin_call()?;
        Ok(self
            .by_id
            .get(restaurant_id)
            .map(|&idx| self.restaurants[idx].clone()))
    }
}
