use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Deadline exceeded before {stage}")]
pub struct DeadlineExceeded {
    pub stage: &'static str,
}

/// Point in time after which a request gives up.
///
/// `Deadline::none()` never expires. Checks happen before each cache and store
/// call, so a slow call that has already started is allowed to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub const fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// A timeout too large to represent is treated as no deadline.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::none, Self::after)
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self, stage: &'static str) -> Result<(), DeadlineExceeded> {
        if self.is_expired() {
            Err(DeadlineExceeded { stage })
        } else {
            Ok(())
        }
    }
}
