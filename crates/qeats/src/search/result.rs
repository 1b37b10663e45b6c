use qeats_store::{Location, RestaurantRecord};
use serde::{Deserialize, Serialize};

/// A restaurant as returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub restaurant_id: String,
    pub name: String,
    #[serde(flatten)]
    pub location: Location,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl From<&RestaurantRecord> for SearchResult {
    fn from(record: &RestaurantRecord) -> Self {
        Self {
            restaurant_id: record.restaurant_id.clone(),
            name: record.name.clone(),
            location: record.location,
            attributes: record.attributes.clone(),
        }
    }
}

impl From<RestaurantRecord> for SearchResult {
    fn from(record: RestaurantRecord) -> Self {
        Self {
            restaurant_id: record.restaurant_id,
            name: record.name,
            location: record.location,
            attributes: record.attributes,
        }
    }
}
