//! Movement policy deciding whether a reminder should fire.
//!
//! The policy is a pure function over the previous reminder, the new fix and
//! the configured thresholds. Both thresholds are necessary conditions: a
//! reminder needs the cool-down to have elapsed *and* the user to have moved
//! far enough from where the last one fired.
//!
//! # Order of checks
//!
//! 1. Cool-down: if a previous reminder exists and `now - last < interval`,
//!    nothing fires no matter how far the user moved.
//! 2. Distance: if a previous location exists and the new fix is closer than
//!    the threshold, nothing fires no matter how long ago the last one was.
//! 3. Otherwise fire.
//!
//! With no history at all the first fix always fires.

use chrono::{DateTime, Duration, Utc};

use crate::geo::GeoPoint;
use crate::settings::Settings;

/// Thresholds for the reminder decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementPolicy {
    pub minimum_interval: Duration,
    pub minimum_distance_meters: f64,
}

impl MovementPolicy {
    #[must_use]
    pub fn new(minimum_interval: Duration, minimum_distance_meters: f64) -> Self {
        Self {
            minimum_interval,
            minimum_distance_meters,
        }
    }

    /// Policy matching a settings snapshot.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.minimum_interval(),
            settings.minimum_distance_meters(),
        )
    }

    /// Decides whether a reminder should fire for `new_location` at `now`.
    ///
    /// A clock that moved backwards (`now` before `last_notified_at`) counts
    /// as still inside the cool-down.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use leavecheck_core::geo::GeoPoint;
    /// use leavecheck_core::policy::MovementPolicy;
    ///
    /// let policy = MovementPolicy::new(Duration::minutes(30), 200.0);
    /// let here = GeoPoint::new(35.68, 139.76).unwrap();
    ///
    /// // No history: always remind.
    /// assert!(policy.should_notify(None, None, &here, Utc::now()));
    /// ```
    #[must_use]
    pub fn should_notify(
        &self,
        last_notified_at: Option<DateTime<Utc>>,
        last_location: Option<&GeoPoint>,
        new_location: &GeoPoint,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(last) = last_notified_at {
            if now - last < self.minimum_interval {
                return false;
            }
        }

        if let Some(previous) = last_location {
            if new_location.distance_to(previous) < self.minimum_distance_meters {
                return false;
            }
        }

        true
    }
}

impl Default for MovementPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
