//! Configuration module for LeaveCheck Monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `LEAVECHECK_ITEMS` | No | all | Comma-separated items (`phone,wallet,keys,glasses`) |
//! | `LEAVECHECK_MIN_INTERVAL_MINUTES` | No | 30 | Cool-down between reminders (5-240) |
//! | `LEAVECHECK_MIN_DISTANCE_METERS` | No | 200 | Movement needed for a new reminder (50-1000) |
//! | `LEAVECHECK_INITIAL_AUTHORIZATION` | No | `not_determined` | Location permission at startup |
//!
//! # Example
//!
//! ```no_run
//! use leavecheck_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Interval: {} min", config.settings.minimum_interval_minutes());
//! ```

use std::env;

use leavecheck_core::settings::{DEFAULT_DISTANCE_METERS, DEFAULT_INTERVAL_MINUTES};
use leavecheck_core::{AuthorizationState, CheckItem, Settings, SettingsError};
use thiserror::Error;

const ITEMS_VAR: &str = "LEAVECHECK_ITEMS";
const INTERVAL_VAR: &str = "LEAVECHECK_MIN_INTERVAL_MINUTES";
const DISTANCE_VAR: &str = "LEAVECHECK_MIN_DISTANCE_METERS";
const AUTHORIZATION_VAR: &str = "LEAVECHECK_INITIAL_AUTHORIZATION";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration for the LeaveCheck Monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reminder settings handed to the coordinator.
    pub settings: Settings,

    /// Location permission the simulated source reports before any event.
    pub initial_authorization: AuthorizationState,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if any variable is set but cannot be parsed or
    /// is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: LEAVECHECK_ITEMS (default: all, empty list falls back to all)
        let items = match env::var(ITEMS_VAR) {
            Ok(val) => {
                let items = val
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<CheckItem>()
                            .map_err(|e| ConfigError::invalid(ITEMS_VAR, e.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if items.is_empty() {
                    CheckItem::ALL.to_vec()
                } else {
                    items
                }
            }
            Err(_) => CheckItem::ALL.to_vec(),
        };

        // Optional: LEAVECHECK_MIN_INTERVAL_MINUTES (default: 30)
        let interval = match env::var(INTERVAL_VAR) {
            Ok(val) => val.trim().parse::<u32>().map_err(|_| {
                ConfigError::invalid(INTERVAL_VAR, format!("expected whole minutes, got '{val}'"))
            })?,
            Err(_) => DEFAULT_INTERVAL_MINUTES,
        };

        // Optional: LEAVECHECK_MIN_DISTANCE_METERS (default: 200)
        let distance = match env::var(DISTANCE_VAR) {
            Ok(val) => val.trim().parse::<f64>().map_err(|_| {
                ConfigError::invalid(DISTANCE_VAR, format!("expected meters, got '{val}'"))
            })?,
            Err(_) => DEFAULT_DISTANCE_METERS,
        };

        let settings = Settings::new(items, interval, distance).map_err(|e| {
            let key = match e {
                SettingsError::IntervalOutOfRange { .. } => INTERVAL_VAR,
                SettingsError::DistanceOutOfRange { .. } => DISTANCE_VAR,
                SettingsError::UnknownItem(_) => ITEMS_VAR,
            };
            ConfigError::invalid(key, e.to_string())
        })?;

        // Optional: LEAVECHECK_INITIAL_AUTHORIZATION (default: not_determined)
        let initial_authorization = match env::var(AUTHORIZATION_VAR) {
            Ok(val) => val
                .parse::<AuthorizationState>()
                .map_err(|e| ConfigError::invalid(AUTHORIZATION_VAR, e))?,
            Err(_) => AuthorizationState::NotDetermined,
        };

        Ok(Self {
            settings,
            initial_authorization,
        })
    }
}
