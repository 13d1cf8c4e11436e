//! Trace replay.
//!
//! A trace is a JSON-lines file. Each non-blank line is a [`TraceEntry`]: a
//! timestamp plus a [`LocationEvent`] in its wire form, for example:
//!
//! ```text
//! {"at":"2026-03-02T08:00:00Z","type":"authorization_changed","status":"authorized_full"}
//! {"at":"2026-03-02T08:05:00Z","type":"locations_updated","locations":[{"latitude":35.68,"longitude":139.76,"timestamp":"2026-03-02T08:05:00Z"}]}
//! {"at":"2026-03-02T09:00:00Z","type":"visited","visit":{"latitude":35.69,"longitude":139.70}}
//! ```
//!
//! Lines starting with `#` are comments. The replayer attaches the coordinator
//! to a simulated location source, moves a manual clock to each entry's
//! timestamp and emits the event through the source. Each entry's outcome is
//! awaited before the clock moves on.

use std::io::BufRead;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use leavecheck_core::{
    IgnoreReason, LocationEvent, ManualClock, MonitoringCoordinator, MovementOutcome,
    NotificationSender, SettingsProvider,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MonitorError, Result};

/// Capacity of the source-to-coordinator event channel during a replay.
const EVENT_BUFFER: usize = 16;
use crate::source::SimulatedLocationSource;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// When the event was delivered.
    pub at: DateTime<Utc>,

    #[serde(flatten)]
    pub event: LocationEvent,
}

/// Parses a JSON-lines trace.
///
/// # Errors
///
/// Returns [`MonitorError::Io`] if reading fails and [`MonitorError::Trace`]
/// with the 1-based line number if a line is not a valid entry.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<TraceEntry>> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(trimmed).map_err(|source| MonitorError::Trace {
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Totals for one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub events: usize,
    pub authorization_changes: usize,
    pub notified: usize,
    pub suppressed: usize,
    pub ignored: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: MovementOutcome) {
        self.events += 1;
        match outcome {
            MovementOutcome::Notified { .. } => self.notified += 1,
            MovementOutcome::Suppressed => self.suppressed += 1,
            MovementOutcome::Ignored(IgnoreReason::NotMovement) => {
                self.authorization_changes += 1;
            }
            MovementOutcome::Ignored(_) => self.ignored += 1,
        }
    }
}

/// Feeds trace entries through a coordinator.
pub struct Replayer {
    coordinator: Arc<MonitoringCoordinator>,
    source: Arc<SimulatedLocationSource>,
    clock: Arc<ManualClock>,
}

impl Replayer {
    #[must_use]
    pub fn new(
        coordinator: Arc<MonitoringCoordinator>,
        source: Arc<SimulatedLocationSource>,
        clock: Arc<ManualClock>,
    ) -> Self {
        Self {
            coordinator,
            source,
            clock,
        }
    }

    /// Builds a coordinator wired to a simulated source and `sender`.
    ///
    /// The manual clock starts at `start`; replays move it forward.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Coordinator`] outside a tokio runtime.
    pub fn assemble(
        config: &Config,
        sender: Arc<dyn NotificationSender>,
        start: DateTime<Utc>,
    ) -> Result<Self> {
        let source = Arc::new(SimulatedLocationSource::new(config.initial_authorization));
        let clock = Arc::new(ManualClock::new(start));
        let settings = SettingsProvider::new(config.settings.clone());

        let coordinator = MonitoringCoordinator::new(
            source.clone(),
            sender,
            settings.subscribe(),
            clock.clone(),
        )?;

        Ok(Self::new(Arc::new(coordinator), source, clock))
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<MonitoringCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn source(&self) -> &Arc<SimulatedLocationSource> {
        &self.source
    }

    /// Replays `entries` in order and returns the totals.
    ///
    /// Events travel the same path as live ones: the source emits them and
    /// the coordinator's event pump handles them. The subscription is closed
    /// and the pump joined before returning.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Pump`] if the event pump panicked.
    pub async fn run(&self, entries: &[TraceEntry]) -> Result<ReplaySummary> {
        let (outcome_tx, mut outcomes) = mpsc::unbounded_channel();
        let pump = self
            .coordinator
            .attach_with_outcomes(EVENT_BUFFER, outcome_tx);

        let mut summary = ReplaySummary::default();
        for entry in entries {
            self.clock.set(entry.at);
            if !self.source.emit(entry.event.clone()).await {
                warn!(at = %entry.at, "Event pump stopped, abandoning replay");
                break;
            }
            let Some(outcome) = outcomes.recv().await else {
                warn!(at = %entry.at, "Event pump stopped, abandoning replay");
                break;
            };
            debug!(at = %entry.at, ?outcome, "Replayed trace entry");
            summary.record(outcome);
        }

        self.source.close();
        pump.await?;

        info!(
            events = summary.events,
            notified = summary.notified,
            suppressed = summary.suppressed,
            ignored = summary.ignored,
            "Replay finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leavecheck_core::AuthorizationState;

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let trace = "\n# morning commute\n{\"at\":\"2026-03-02T08:00:00Z\",\"type\":\"authorization_changed\",\"status\":\"authorized_full\"}\n\n";
        let entries = parse_trace(trace.as_bytes()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].event,
            LocationEvent::AuthorizationChanged {
                status: AuthorizationState::AuthorizedFull
            }
        );
    }

    #[test]
    fn parse_reports_line_number() {
        let trace = "{\"at\":\"2026-03-02T08:00:00Z\",\"type\":\"visited\",\"visit\":{\"latitude\":1.0,\"longitude\":2.0}}\n{\"at\":\"not a time\",\"type\":\"visited\"}\n";
        let err = parse_trace(trace.as_bytes()).unwrap_err();
        assert!(matches!(err, MonitorError::Trace { line: 2, .. }));
    }

    #[test]
    fn parse_keeps_invalid_visit_coordinates() {
        let trace = r#"{"at":"2026-03-02T08:00:00Z","type":"visited","visit":{"latitude":999.0,"longitude":0.0}}"#;
        let entries = parse_trace(trace.as_bytes()).unwrap();
        match &entries[0].event {
            LocationEvent::Visited { visit } => assert_eq!(visit.latitude, 999.0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = ReplaySummary::default();
        summary.record(MovementOutcome::Notified {
            request_id: uuid::Uuid::nil(),
        });
        summary.record(MovementOutcome::Suppressed);
        summary.record(MovementOutcome::Ignored(IgnoreReason::InvalidCoordinate));
        summary.record(MovementOutcome::Ignored(IgnoreReason::NotMovement));

        assert_eq!(
            summary,
            ReplaySummary {
                events: 4,
                authorization_changes: 1,
                notified: 1,
                suppressed: 1,
                ignored: 1,
            }
        );
    }
}
