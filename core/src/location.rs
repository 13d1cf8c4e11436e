//! Location boundary.
//!
//! A [`LocationSource`] wraps the platform location service. It is the
//! ownership root for event delivery: the coordinator registers a channel
//! sender through [`LocationSource::subscribe`] and the source pushes
//! [`LocationEvent`]s into it. The source never holds the coordinator itself.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{AuthorizationState, TimedLocation, Visit};

/// Events emitted by a location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationEvent {
    /// The user changed location permission.
    AuthorizationChanged { status: AuthorizationState },

    /// New fixes, oldest first. The platform never delivers an empty batch,
    /// but consumers tolerate one.
    LocationsUpdated { locations: Vec<TimedLocation> },

    /// The platform detected a dwell.
    Visited { visit: Visit },
}

/// The platform location service as seen by the coordinator.
///
/// All calls are non-blocking requests; outcomes arrive later as
/// [`LocationEvent`]s.
pub trait LocationSource: Send + Sync {
    /// Current permission level.
    fn authorization_status(&self) -> AuthorizationState;

    /// Prompts for while-in-use permission.
    fn request_when_in_use_authorization(&self);

    /// Prompts for the upgrade to always-on permission.
    fn request_always_authorization(&self);

    /// Starts significant-change and visit monitoring.
    fn start_continuous_monitoring(&self);

    /// Stops significant-change and visit monitoring.
    fn stop_continuous_monitoring(&self);

    /// Registers the single event handler. A later call replaces the earlier one.
    fn subscribe(&self, events: mpsc::Sender<LocationEvent>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_event_wire_format() {
        let event = LocationEvent::AuthorizationChanged {
            status: AuthorizationState::AuthorizedLimited,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "authorization_changed", "status": "authorized_limited"})
        );
    }

    #[test]
    fn visit_event_keeps_invalid_coordinate() {
        let json = r#"{"type":"visited","visit":{"latitude":999.0,"longitude":0.0}}"#;
        let event: LocationEvent = serde_json::from_str(json).unwrap();
        match event {
            LocationEvent::Visited { visit } => assert!(visit.point().is_err()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn locations_event_rejects_invalid_fix() {
        let json = r#"{"type":"locations_updated","locations":[
            {"latitude":91.0,"longitude":0.0,"timestamp":"2026-01-01T00:00:00Z"}
        ]}"#;
        assert!(serde_json::from_str::<LocationEvent>(json).is_err());
    }
}
