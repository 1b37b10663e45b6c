//! Spatial utilities: geohash bucket keys and great-circle distance.
//!
//! Both are small, pure functions with a fixed contract. The cache-aside index
//! keys its entries by [`BucketKey`], and the proximity filter measures with
//! [`haversine_km`].

mod bucket;
mod distance;

pub use bucket::{
    BucketKey, BucketPrecision, DEFAULT_PRECISION, MAX_PRECISION, encode, encode_coordinates,
};
pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use error::GeoError;

mod error {
    use qeats_store::LocationError;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum GeoError {
        #[error("Invalid location: {0}")]
        InvalidLocation(#[from] LocationError),
        #[error("Bucket precision must be between 1 and {max}, got {got}")]
        InvalidPrecision { got: u8, max: u8 },
    }
}
