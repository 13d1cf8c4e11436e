//! Shared data types for leave-behind reminders.
//!
//! All wire-facing enums serialize as snake_case, matching the event trace
//! format consumed by the monitor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoordinateError, SettingsError};
use crate::geo::GeoPoint;

/// A personal item the user is reminded to check.
///
/// The catalog is closed. Ordering follows declaration order so item sets
/// render consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckItem {
    Phone,
    Wallet,
    Keys,
    Glasses,
}

impl CheckItem {
    /// Every item, in display order.
    pub const ALL: [CheckItem; 4] = [
        CheckItem::Phone,
        CheckItem::Wallet,
        CheckItem::Keys,
        CheckItem::Glasses,
    ];

    /// Stable lowercase identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Wallet => "wallet",
            Self::Keys => "keys",
            Self::Glasses => "glasses",
        }
    }

    /// Identifier of the notification action for this item.
    #[must_use]
    pub fn action_identifier(&self) -> &'static str {
        match self {
            Self::Phone => "CHECK_PHONE",
            Self::Wallet => "CHECK_WALLET",
            Self::Keys => "CHECK_KEYS",
            Self::Glasses => "CHECK_GLASSES",
        }
    }

    /// Single-glyph label shown on the item's notification button.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Phone => "け",
            Self::Wallet => "さ",
            Self::Keys => "キ",
            Self::Glasses => "め",
        }
    }
}

impl fmt::Display for CheckItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckItem {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckItem::ALL
            .into_iter()
            .find(|item| item.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettingsError::UnknownItem(s.to_string()))
    }
}

/// Location permission as reported by the location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Denied by the user or restricted by policy.
    DeniedOrRestricted,
    /// Authorized only while the app is in use.
    AuthorizedLimited,
    /// Authorized at all times.
    AuthorizedFull,
}

impl AuthorizationState {
    /// Whether continuous monitoring may run under this state.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::AuthorizedLimited | Self::AuthorizedFull)
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotDetermined => "not_determined",
            Self::DeniedOrRestricted => "denied_or_restricted",
            Self::AuthorizedLimited => "authorized_limited",
            Self::AuthorizedFull => "authorized_full",
        };
        f.write_str(s)
    }
}

impl FromStr for AuthorizationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not_determined" => Ok(Self::NotDetermined),
            "denied_or_restricted" => Ok(Self::DeniedOrRestricted),
            "authorized_limited" => Ok(Self::AuthorizedLimited),
            "authorized_full" => Ok(Self::AuthorizedFull),
            other => Err(format!("unknown authorization state '{other}'")),
        }
    }
}

/// A location fix with the time it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedLocation {
    #[serde(flatten)]
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

impl TimedLocation {
    #[must_use]
    pub fn new(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self { point, timestamp }
    }
}

/// A dwell event reported by the platform.
///
/// The coordinate is kept raw: platforms report sentinel values for visits
/// they could not place, so validation happens when the visit is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<DateTime<Utc>>,
}

impl Visit {
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            arrival: None,
            departure: None,
        }
    }

    /// The visit coordinate as a validated point.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] for ill-formed coordinates.
    pub fn point(&self) -> Result<GeoPoint, CoordinateError> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// When and where the last reminder fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationMoment {
    pub at: DateTime<Utc>,
    pub location: GeoPoint,
}
