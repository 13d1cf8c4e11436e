//! LeaveCheck core - leave-behind reminder decisions.
//!
//! This crate turns a stream of location and visit events into a throttled
//! stream of "check your phone, wallet, keys, glasses" reminders.
//!
//! # Overview
//!
//! The [`policy::MovementPolicy`] is a pure decision: a reminder fires only
//! once the cool-down has elapsed *and* the user has moved far enough from
//! the last reminder. The [`coordinator::MonitoringCoordinator`] owns the
//! throttle state and the monitoring lifecycle, reacting to authorization
//! changes from a [`location::LocationSource`] and dispatching reminders to a
//! [`notification::NotificationSender`].
//!
//! Nothing here renders UI, persists settings or talks to the platform; those
//! are collaborators passed in at assembly time.
//!
//! # Modules
//!
//! - [`types`]: Check items, authorization states, fixes and visits
//! - [`geo`]: Validated coordinates and great-circle distance
//! - [`settings`]: Settings snapshot and change feed
//! - [`policy`]: The reminder decision
//! - [`location`]: Location source boundary and event types
//! - [`notification`]: Notification sender boundary and reminder requests
//! - [`clock`]: Injected time sources
//! - [`coordinator`]: Event handling and lifecycle
//! - [`error`]: Error types

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod geo;
pub mod location;
pub mod notification;
pub mod policy;
pub mod settings;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{IgnoreReason, MonitoringCoordinator, MovementOutcome, StartOutcome};
pub use error::{CoordinateError, CoordinatorError, NotifyError, SettingsError};
pub use geo::GeoPoint;
pub use location::{LocationEvent, LocationSource};
pub use notification::{NotificationAction, NotificationSender, ReminderRequest};
pub use policy::MovementPolicy;
pub use settings::{Settings, SettingsProvider};
pub use types::{AuthorizationState, CheckItem, NotificationMoment, TimedLocation, Visit};
