use std::sync::Arc;

use crate::{
    Result,
    model::{ItemRecord, MenuRecord, RestaurantRecord},
};

/// Read-only query primitives over the restaurant catalogue.
///
/// Implementations may fail with [`StoreError::Unavailable`](crate::StoreError::Unavailable)
/// when the backing store cannot be reached. The search core never retries;
/// retry policy, if any, belongs to the implementation.
///
/// Every method returns results in the store's iteration order, which callers
/// may rely on being stable for a stable snapshot.
pub trait RestaurantStore: Send + Sync {
    /// Every restaurant in the catalogue.
    fn find_all(&self) -> Result<Vec<RestaurantRecord>>;

    /// Restaurants whose name equals `name` exactly.
    fn find_by_name_exact(&self, name: &str) -> Result<Vec<RestaurantRecord>>;

    /// Restaurants carrying a cuisine/attribute tag that matches `text`.
    fn find_by_attributes(&self, text: &str) -> Result<Vec<RestaurantRecord>>;

    /// Menus containing an item whose name matches `text`.
    fn find_menus_by_item_name(&self, text: &str) -> Result<Vec<MenuRecord>>;

    /// Items carrying an attribute tag that matches `text`.
    fn find_items_by_attributes(&self, text: &str) -> Result<Vec<ItemRecord>>;

    /// Menus containing at least one of `item_ids`.
    fn find_menus_by_item_ids(&self, item_ids: &[String]) -> Result<Vec<MenuRecord>>;

    fn find_by_id(&self, restaurant_id: &str) -> Result<Option<RestaurantRecord>>;
}

impl<T: RestaurantStore + ?Sized> RestaurantStore for Arc<T> {
    fn find_all(&self) -> Result<Vec<RestaurantRecord>> {
        (**self).find_all()
    }

    fn find_by_name_exact(&self, name: &str) -> Result<Vec<RestaurantRecord>> {
        (**self).find_by_name_exact(name)
    }

    fn find_by_attributes(&self, text: &str) -> Result<Vec<RestaurantRecord>> {
        (**self).find_by_attributes(text)
    }

    fn find_menus_by_item_name(&self, text: &str) -> Result<Vec<MenuRecord>> {
        (**self).find_menus_by_item_name(text)
    }

    fn find_items_by_attributes(&self, text: &str) -> Result<Vec<ItemRecord>> {
        (**self).find_items_by_attributes(text)
    }

    fn find_menus_by_item_ids(&self, item_ids: &[String]) -> Result<Vec<MenuRecord>> {
        (**self).find_menus_by_item_ids(item_ids)
    }

    fn find_by_id(&self, restaurant_id: &str) -> Result<Option<RestaurantRecord>> {
        (**self).find_by_id(restaurant_id)
    }
}
