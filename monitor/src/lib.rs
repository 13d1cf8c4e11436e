//! LeaveCheck Monitor - trace replay for the reminder coordinator.
//!
//! This crate assembles a [`leavecheck_core::MonitoringCoordinator`] against
//! concrete stand-ins for the platform: a simulated location source and a
//! console notification sender. Recorded location traces are replayed
//! through it to see which reminders would fire.
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for monitor operations
//! - [`source`]: Simulated location source
//! - [`sender`]: Notification sender printing JSON lines
//! - [`replay`]: Trace parsing and replay

pub mod config;
pub mod error;
pub mod replay;
pub mod sender;
pub mod source;

pub use config::{Config, ConfigError};
pub use error::{MonitorError, Result};
pub use replay::{parse_trace, ReplaySummary, Replayer, TraceEntry};
pub use sender::ConsoleSender;
pub use source::{SimulatedLocationSource, SourceCounters};
