use chrono::NaiveTime;
use qeats_store::{Location, RestaurantRecord};

use crate::geo::haversine_km;

/// Strictly between opening and closing time.
///
/// A restaurant is not open at the exact minute it opens or closes, and hours
/// that wrap past midnight (`closes_at <= opens_at`) are never open.
pub fn is_open_at(record: &RestaurantRecord, current_time: NaiveTime) -> bool {
    record.opens_at < current_time && current_time < record.closes_at
}

/// Open now and strictly closer than `radius_km` to the requester.
pub fn is_eligible(
    record: &RestaurantRecord,
    requester: &Location,
    current_time: NaiveTime,
    radius_km: f64,
) -> bool {
    is_open_at(record, current_time) && haversine_km(requester, &record.location) < radius_km
}
