//! Document shapes held by the backing store.
//!
//! These mirror the restaurant, menu and item documents of the QEats catalogue.
//! The search core only ever reads them.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected coordinates.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LocationError {
    #[error("Coordinates must be finite, got ({latitude}, {longitude})")]
    NonFinite { latitude: f64, longitude: f64 },
    #[error("Latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// A validated point on the globe in decimal degrees.
///
/// Construction (and deserialization) rejects non-finite values, latitudes
/// outside `[-90, 90]` and longitudes outside `[-180, 180]`, so every
/// `Location` in the system can be encoded and measured without further checks.
///
/// # Examples
///
/// ```rust
/// use qeats_store::Location;
///
/// let bangalore = Location::new(12.9, 77.6)?;
/// assert_eq!(bangalore.latitude(), 12.9);
///
/// assert!(Location::new(91.0, 0.0).is_err());
/// # Ok::<(), qeats_store::LocationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(LocationError::NonFinite {
                latitude,
                longitude,
            });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    const FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M:%S"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).ok_or_else(|| {
            D::Error::custom(format!(
                "invalid time of day '{raw}', expected HH:MM or HH:MM:SS"
            ))
        })
    }
}

/// A restaurant document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub restaurant_id: String,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(flatten)]
    pub location: Location,
    #[serde(with = "time_of_day")]
    pub opens_at: NaiveTime,
    #[serde(with = "time_of_day")]
    pub closes_at: NaiveTime,
    /// Cuisine and attribute tags such as `"Chinese"` or `"Vegan"`.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl RestaurantRecord {
    pub fn new(
        restaurant_id: impl Into<String>,
        name: impl Into<String>,
        location: Location,
        opens_at: NaiveTime,
        closes_at: NaiveTime,
    ) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            name: name.into(),
            city: String::new(),
            image_url: String::new(),
            location,
            opens_at,
            closes_at,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }
}

/// A dish on a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    /// Item tags such as `"Spicy"` or `"Vegetarian"`.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl ItemRecord {
    pub fn new<I, S>(item_id: impl Into<String>, name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            price: 0.0,
            image_url: String::new(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

/// The menu of a single restaurant. References the restaurant by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub restaurant_id: String,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

impl MenuRecord {
    pub fn new(restaurant_id: impl Into<String>, items: Vec<ItemRecord>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            items,
        }
    }
}
