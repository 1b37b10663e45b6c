//! Serving radius as a function of time of day.
//!
//! During peak windows delivery capacity is stretched, so restaurants are only
//! offered within a tighter radius. Outside them the wider normal radius
//! applies.

use std::fmt;

use chrono::{NaiveTime, Timelike};
pub use error::PolicyError;

pub const PEAK_RADIUS_KM: f64 = 3.0;
pub const NORMAL_RADIUS_KM: f64 = 5.0;

/// Breakfast, lunch and dinner rush.
const DEFAULT_PEAK_WINDOWS: [((u32, u32), (u32, u32)); 3] =
    [((8, 0), (10, 0)), ((13, 0), (14, 0)), ((19, 0), (21, 0))];

/// A named stretch of the day with a tightened serving radius.
///
/// Both bounds are whole minutes and both are inclusive at minute granularity:
/// the window covers the half-open interval `[start, end + 1 minute)`. So a
/// window ending at 10:00 still contains 10:00:59 but not 10:01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl PeakWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, PolicyError> {
        let (start, end) = (truncate_to_minute(start), truncate_to_minute(end));
        if start > end {
            return Err(PolicyError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute = truncate_to_minute(time);
        self.start <= minute && minute <= self.end
    }

    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    pub const fn end(&self) -> NaiveTime {
        self.end
    }
}

impl fmt::Display for PeakWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Maps a time of day to the serving radius in kilometres.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveTime;
/// use qeats::ServingPolicy;
///
/// let policy = ServingPolicy::default();
/// let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
///
/// assert_eq!(policy.radius_for(at(10, 0)), 3.0);
/// assert_eq!(policy.radius_for(at(10, 1)), 5.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServingPolicy {
    pub(crate) peak_windows: Vec<PeakWindow>,
    pub(crate) peak_radius_km: f64,
    pub(crate) normal_radius_km: f64,
}

impl Default for ServingPolicy {
    fn default() -> Self {
        let peak_windows = DEFAULT_PEAK_WINDOWS
            .iter()
            .filter_map(|&((sh, sm), (eh, em))| {
                let start = NaiveTime::from_hms_opt(sh, sm, 0)?;
                let end = NaiveTime::from_hms_opt(eh, em, 0)?;
                PeakWindow::new(start, end).ok()
            })
            .collect();
        Self {
            peak_windows,
            peak_radius_km: PEAK_RADIUS_KM,
            normal_radius_km: NORMAL_RADIUS_KM,
        }
    }
}

impl ServingPolicy {
    pub fn new(
        peak_windows: Vec<PeakWindow>,
        peak_radius_km: f64,
        normal_radius_km: f64,
    ) -> Result<Self, PolicyError> {
        validate_radius(peak_radius_km)?;
        validate_radius(normal_radius_km)?;
        Ok(Self {
            peak_windows,
            peak_radius_km,
            normal_radius_km,
        })
    }

    pub fn is_peak(&self, time: NaiveTime) -> bool {
        self.peak_windows.iter().any(|window| window.contains(time))
    }

    pub fn radius_for(&self, time: NaiveTime) -> f64 {
        if self.is_peak(time) {
            self.peak_radius_km
        } else {
            self.normal_radius_km
        }
    }

    pub fn peak_windows(&self) -> &[PeakWindow] {
        &self.peak_windows
    }

    pub const fn peak_radius_km(&self) -> f64 {
        self.peak_radius_km
    }

    pub const fn normal_radius_km(&self) -> f64 {
        self.normal_radius_km
    }
}

pub(crate) fn validate_radius(radius_km: f64) -> Result<(), PolicyError> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(())
    } else {
        Err(PolicyError::InvalidRadius(radius_km))
    }
}

mod error {
    use chrono::NaiveTime;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum PolicyError {
        #[error("Peak window starts at {start} but ends earlier at {end}")]
        InvertedWindow { start: NaiveTime, end: NaiveTime },
        #[error("Serving radius must be positive and finite, got {0}")]
        InvalidRadius(f64),
        #[error("Invalid time of day '{0}', expected HH:MM")]
        InvalidTime(String),
    }
}
