//! Error types for the LeaveCheck Monitor.
//!
//! This module defines the error types used throughout the monitor crate,
//! providing structured error handling with clear, human-readable messages.

use leavecheck_core::CoordinatorError;
use thiserror::Error;

/// Errors that can occur during monitor operations.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A trace line could not be parsed.
    #[error("trace line {line}: {source}")]
    Trace {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The coordinator could not be assembled.
    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// The event pump task panicked or was cancelled.
    #[error("event pump failed: {0}")]
    Pump(#[from] tokio::task::JoinError),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MonitorError = io_err.into();
        assert!(matches!(err, MonitorError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn trace_error_reports_line_and_source() {
        use std::error::Error;

        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err = MonitorError::Trace {
            line: 7,
            source: json_err,
        };
        assert!(err.to_string().starts_with("trace line 7:"));
        assert!(err.source().is_some());
    }

    #[tokio::test]
    async fn pump_panic_converts() {
        let join_err = tokio::spawn(async { panic!("pump exploded") })
            .await
            .unwrap_err();
        let err: MonitorError = join_err.into();
        assert!(matches!(err, MonitorError::Pump(_)));
        assert!(err.to_string().starts_with("event pump failed:"));
    }
}
