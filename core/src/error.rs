//! Error types for the LeaveCheck core.
//!
//! None of these are fatal to the coordinator. Settings and coordinate errors
//! reject bad input at construction time, notification errors are reported by
//! external senders and swallowed after logging.

use thiserror::Error;

/// Errors produced when building a [`Settings`](crate::settings::Settings) snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// Minimum interval is outside the accepted range.
    #[error("minimum interval must be between {min} and {max} minutes, got {value}")]
    IntervalOutOfRange { value: u32, min: u32, max: u32 },

    /// Minimum distance is outside the accepted range (or not a number).
    #[error("minimum distance must be between {min} and {max} meters, got {value}")]
    DistanceOutOfRange { value: f64, min: f64, max: f64 },

    /// A check item name did not match the catalog.
    #[error("unknown check item: {0}")]
    UnknownItem(String),
}

/// Errors produced when validating a raw coordinate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    /// Latitude is not a finite value in `[-90, 90]`.
    #[error("latitude out of range: {0}")]
    Latitude(f64),

    /// Longitude is not a finite value in `[-180, 180]`.
    #[error("longitude out of range: {0}")]
    Longitude(f64),
}

/// Errors reported by a [`NotificationSender`](crate::notification::NotificationSender).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The user has not granted permission to post notifications.
    #[error("notifications not authorized")]
    NotAuthorized,

    /// The platform rejected or failed to schedule the notification.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Errors produced while assembling a coordinator.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// The coordinator must be built inside a tokio runtime so it can spawn
    /// fire-and-forget notification work.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_error_interval_display() {
        let err = SettingsError::IntervalOutOfRange {
            value: 2,
            min: 5,
            max: 240,
        };
        assert_eq!(
            err.to_string(),
            "minimum interval must be between 5 and 240 minutes, got 2"
        );
    }

    #[test]
    fn settings_error_unknown_item_display() {
        let err = SettingsError::UnknownItem("umbrella".to_string());
        assert_eq!(err.to_string(), "unknown check item: umbrella");
    }

    #[test]
    fn coordinate_error_display() {
        assert_eq!(
            CoordinateError::Latitude(999.0).to_string(),
            "latitude out of range: 999"
        );
        assert_eq!(
            CoordinateError::Longitude(-200.5).to_string(),
            "longitude out of range: -200.5"
        );
    }

    #[test]
    fn notify_error_display() {
        assert_eq!(
            NotifyError::NotAuthorized.to_string(),
            "notifications not authorized"
        );
        assert_eq!(
            NotifyError::Delivery("quota exceeded".to_string()).to_string(),
            "delivery failed: quota exceeded"
        );
    }

    #[test]
    fn coordinator_error_from_missing_runtime() {
        let err = tokio::runtime::Handle::try_current().unwrap_err();
        let err: CoordinatorError = err.into();
        assert!(err.to_string().starts_with("no tokio runtime available"));
    }
}
