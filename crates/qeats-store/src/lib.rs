//! Records and the read-only store collaborator behind QEats restaurant search.
//!
//! The search core never owns persistence. It talks to a [`RestaurantStore`],
//! which exposes a handful of simple query primitives over restaurant, menu
//! and item documents. This crate defines those documents, the trait, and an
//! [`InMemoryStore`] that can be loaded from JSON fixture files.
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::debug;

pub mod matcher;
pub mod memory;
pub mod model;
pub mod store;
pub mod test_data;

pub const DATA_DIR_DEFAULT: &str = "./qeats_data";

/// Directory holding `restaurants.json` and `menus.json`.
///
/// Resolved once from `QEATS_DATA_DIR`, falling back to the platform data
/// directory when the `system-dirs` feature is enabled, then to
/// [`DATA_DIR_DEFAULT`].
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var("QEATS_DATA_DIR") {
        debug!(dir = %dir, "Using data directory from QEATS_DATA_DIR");
        return PathBuf::from(dir);
    }

    #[cfg(feature = "system-dirs")]
    if let Some(dirs) = directories::ProjectDirs::from("", "", "qeats") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DATA_DIR_DEFAULT)
});

mod error {
    use std::path::PathBuf;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum StoreError {
        #[error("Store unavailable: {0}")]
        Unavailable(String),
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Invalid query pattern: {0}")]
        Pattern(#[from] regex::Error),
        #[error("Required data file not found: {0}")]
        RequiredFileNotFound(PathBuf),
        #[error("Duplicate restaurant id '{0}'")]
        DuplicateRestaurant(String),
    }

    impl StoreError {
        /// True when the backing store could not be reached at all.
        pub const fn is_unavailable(&self) -> bool {
            matches!(self, Self::Unavailable(_))
        }
    }

    pub type Result<T> = std::result::Result<T, StoreError>;
}

pub use error::{Result, StoreError};
pub use matcher::TextMatcher;
pub use memory::InMemoryStore;
pub use model::{
    ItemRecord, Location, LocationError, MenuRecord, RestaurantRecord, parse_time_of_day,
};
pub use store::RestaurantStore;
pub use test_data::{TestDataConfig, create_test_data};
