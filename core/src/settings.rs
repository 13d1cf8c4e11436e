//! Reminder settings snapshot and its change feed.
//!
//! A [`Settings`] value is immutable once built. Changes replace the whole
//! snapshot through a [`SettingsProvider`], which publishes on a
//! `tokio::sync::watch` channel so readers always see a complete value.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::error::SettingsError;
use crate::types::CheckItem;

/// Shortest allowed cool-down between reminders.
pub const MIN_INTERVAL_MINUTES: u32 = 5;

/// Longest allowed cool-down between reminders.
pub const MAX_INTERVAL_MINUTES: u32 = 240;

/// Default cool-down between reminders.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;

/// Smallest movement that can warrant a reminder.
pub const MIN_DISTANCE_METERS: f64 = 50.0;

/// Largest configurable movement threshold.
pub const MAX_DISTANCE_METERS: f64 = 1000.0;

/// Default movement threshold.
pub const DEFAULT_DISTANCE_METERS: f64 = 200.0;

/// User-configured reminder settings.
///
/// Deserialization goes through [`Settings::new`], so a snapshot read from
/// JSON is range-checked like one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSettings", into = "RawSettings")]
pub struct Settings {
    enabled_items: BTreeSet<CheckItem>,
    minimum_interval_minutes: u32,
    minimum_distance_meters: f64,
}

/// Unchecked wire form of [`Settings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    pub enabled_items: BTreeSet<CheckItem>,
    pub minimum_interval_minutes: u32,
    pub minimum_distance_meters: f64,
}

impl TryFrom<RawSettings> for Settings {
    type Error = SettingsError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        Settings::new(
            raw.enabled_items,
            raw.minimum_interval_minutes,
            raw.minimum_distance_meters,
        )
    }
}

impl From<Settings> for RawSettings {
    fn from(settings: Settings) -> Self {
        RawSettings {
            enabled_items: settings.enabled_items,
            minimum_interval_minutes: settings.minimum_interval_minutes,
            minimum_distance_meters: settings.minimum_distance_meters,
        }
    }
}

impl Settings {
    /// Builds a validated settings snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the interval or distance is outside the
    /// accepted range.
    pub fn new(
        enabled_items: impl IntoIterator<Item = CheckItem>,
        minimum_interval_minutes: u32,
        minimum_distance_meters: f64,
    ) -> Result<Self, SettingsError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minimum_interval_minutes) {
            return Err(SettingsError::IntervalOutOfRange {
                value: minimum_interval_minutes,
                min: MIN_INTERVAL_MINUTES,
                max: MAX_INTERVAL_MINUTES,
            });
        }
        // NaN fails `contains`, so it is rejected here too.
        if !(MIN_DISTANCE_METERS..=MAX_DISTANCE_METERS).contains(&minimum_distance_meters) {
            return Err(SettingsError::DistanceOutOfRange {
                value: minimum_distance_meters,
                min: MIN_DISTANCE_METERS,
                max: MAX_DISTANCE_METERS,
            });
        }

        Ok(Self {
            enabled_items: enabled_items.into_iter().collect(),
            minimum_interval_minutes,
            minimum_distance_meters,
        })
    }

    #[must_use]
    pub fn enabled_items(&self) -> &BTreeSet<CheckItem> {
        &self.enabled_items
    }

    #[must_use]
    pub fn minimum_interval_minutes(&self) -> u32 {
        self.minimum_interval_minutes
    }

    #[must_use]
    pub fn minimum_distance_meters(&self) -> f64 {
        self.minimum_distance_meters
    }

    /// The cool-down as a duration.
    #[must_use]
    pub fn minimum_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.minimum_interval_minutes))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_items: CheckItem::ALL.into_iter().collect(),
            minimum_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            minimum_distance_meters: DEFAULT_DISTANCE_METERS,
        }
    }
}

/// Publishes settings snapshots to any number of readers.
///
/// Readers hold a `watch::Receiver<Settings>` and borrow the latest value
/// whenever they need it; a replacement never mutates a snapshot in place.
#[derive(Debug)]
pub struct SettingsProvider {
    tx: watch::Sender<Settings>,
}

impl SettingsProvider {
    #[must_use]
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Returns a receiver that observes every future replacement.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// A clone of the current snapshot.
    #[must_use]
    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Replaces the snapshot. Returns `false` if it was equal to the current one.
    pub fn replace(&self, settings: Settings) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        });

        if changed {
            let current = self.tx.borrow();
            info!(
                items = current.enabled_items.len(),
                interval_minutes = current.minimum_interval_minutes,
                distance_meters = current.minimum_distance_meters,
                "Settings replaced"
            );
        }

        changed
    }
}

impl Default for SettingsProvider {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
