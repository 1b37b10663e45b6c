use std::fmt;

use qeats_store::Location;
use serde::{Deserialize, Serialize};

use super::GeoError;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest supported key. Twelve characters is well under a metre of cell size.
pub const MAX_PRECISION: u8 = 12;
/// Seven characters, roughly a 150 m x 150 m cell.
pub const DEFAULT_PRECISION: u8 = 7;

/// Number of geohash characters in a [`BucketKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketPrecision(u8);

impl BucketPrecision {
    pub fn new(chars: u8) -> Result<Self, GeoError> {
        if chars == 0 || chars > MAX_PRECISION {
            return Err(GeoError::InvalidPrecision {
                got: chars,
                max: MAX_PRECISION,
            });
        }
        Ok(Self(chars))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for BucketPrecision {
    fn default() -> Self {
        Self(DEFAULT_PRECISION)
    }
}

/// Geohash of a location at a fixed precision.
///
/// Locations in the same grid cell share a key. The cache-aside index relies on
/// that to let nearby requesters share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Composite key for a bucket served at a particular radius.
    ///
    /// The radius is rounded to whole metres, so `3.0` and `3.0000001` land on
    /// the same key while `3.0` and `5.0` never do.
    pub fn with_radius_class(&self, radius_km: f64) -> String {
        let metres = (radius_km * 1000.0).round().max(0.0) as u64;
        format!("{}:r{metres}", self.0)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode a validated location as a geohash of `precision` characters.
///
/// Bits alternate longitude, latitude, longitude, ... each halving the
/// remaining interval; every five bits become one base32 character.
pub fn encode(location: &Location, precision: BucketPrecision) -> BucketKey {
    let chars = usize::from(precision.get());
    let (latitude, longitude) = (location.latitude(), location.longitude());
    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lon_lo, mut lon_hi) = (-180.0_f64, 180.0_f64);

    let mut key = String::with_capacity(chars);
    let mut index = 0_usize;
    let mut bits = 0_u8;
    let mut even_bit = true;

    while key.len() < chars {
        let (value, lo, hi) = if even_bit {
            (longitude, &mut lon_lo, &mut lon_hi)
        } else {
            (latitude, &mut lat_lo, &mut lat_hi)
        };
        let mid = (*lo + *hi) / 2.0;
        index <<= 1;
        if value >= mid {
            index |= 1;
            *lo = mid;
        } else {
            *hi = mid;
        }
        even_bit = !even_bit;

        bits += 1;
        if bits == 5 {
            key.push(char::from(BASE32[index]));
            bits = 0;
            index = 0;
        }
    }

    BucketKey(key)
}

/// Validate raw coordinates and precision, then encode.
pub fn encode_coordinates(
    latitude: f64,
    longitude: f64,
    precision: u8,
) -> Result<BucketKey, GeoError> {
    let location = Location::new(latitude, longitude)?;
    let precision = BucketPrecision::new(precision)?;
    Ok(encode(&location, precision))
}
