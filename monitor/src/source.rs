//! Simulated location source.
//!
//! Stands in for the platform location service when replaying traces. It
//! reports whatever authorization it was last told, counts the requests the
//! coordinator makes, and forwards injected events to the subscriber.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use leavecheck_core::{AuthorizationState, LocationEvent, LocationSource};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Counts of requests made against the simulated source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounters {
    pub when_in_use_requests: usize,
    pub always_requests: usize,
    pub monitoring_starts: usize,
    pub monitoring_stops: usize,
}

#[derive(Debug, Default)]
pub struct SimulatedLocationSource {
    status: Mutex<AuthorizationState>,
    subscriber: Mutex<Option<mpsc::Sender<LocationEvent>>>,
    when_in_use_requests: AtomicUsize,
    always_requests: AtomicUsize,
    monitoring_starts: AtomicUsize,
    monitoring_stops: AtomicUsize,
}

impl SimulatedLocationSource {
    #[must_use]
    pub fn new(status: AuthorizationState) -> Self {
        Self {
            status: Mutex::new(status),
            ..Self::default()
        }
    }

    /// Changes the reported authorization without emitting an event.
    pub fn set_authorization(&self, status: AuthorizationState) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Pushes an event to the subscriber, if any.
    ///
    /// Authorization events also update the reported status first, the way
    /// the platform does. Returns `false` if nobody is listening.
    pub async fn emit(&self, event: LocationEvent) -> bool {
        if let LocationEvent::AuthorizationChanged { status } = event {
            self.set_authorization(status);
        }

        let subscriber = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match subscriber {
            Some(tx) => match tx.send(event).await {
                Ok(()) => true,
                Err(_) => {
                    warn!("Location subscriber closed, dropping event");
                    false
                }
            },
            None => false,
        }
    }

    /// Drops the subscriber so its event pump can finish.
    pub fn close(&self) {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn counters(&self) -> SourceCounters {
        SourceCounters {
            when_in_use_requests: self.when_in_use_requests.load(Ordering::SeqCst),
            always_requests: self.always_requests.load(Ordering::SeqCst),
            monitoring_starts: self.monitoring_starts.load(Ordering::SeqCst),
            monitoring_stops: self.monitoring_stops.load(Ordering::SeqCst),
        }
    }
}

impl LocationSource for SimulatedLocationSource {
    fn authorization_status(&self) -> AuthorizationState {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_when_in_use_authorization(&self) {
        debug!("Simulated when-in-use authorization request");
        self.when_in_use_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn request_always_authorization(&self) {
        debug!("Simulated always authorization request");
        self.always_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn start_continuous_monitoring(&self) {
        self.monitoring_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_continuous_monitoring(&self) {
        self.monitoring_stops.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&self, events: mpsc::Sender<LocationEvent>) {
        *self.subscriber.lock().unwrap_or_else(PoisonError::into_inner) = Some(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_requests() {
        let source = SimulatedLocationSource::new(AuthorizationState::NotDetermined);
        source.request_when_in_use_authorization();
        source.request_always_authorization();
        source.request_always_authorization();
        source.start_continuous_monitoring();

        assert_eq!(
            source.counters(),
            SourceCounters {
                when_in_use_requests: 1,
                always_requests: 2,
                monitoring_starts: 1,
                monitoring_stops: 0,
            }
        );
    }

    #[tokio::test]
    async fn emit_without_subscriber_returns_false() {
        let source = SimulatedLocationSource::default();
        let delivered = source
            .emit(LocationEvent::AuthorizationChanged {
                status: AuthorizationState::AuthorizedFull,
            })
            .await;

        assert!(!delivered);
        assert_eq!(
            source.authorization_status(),
            AuthorizationState::AuthorizedFull
        );
    }

    #[tokio::test]
    async fn emit_forwards_to_subscriber() {
        let source = SimulatedLocationSource::default();
        let (tx, mut rx) = mpsc::channel(4);
        source.subscribe(tx);

        let event = LocationEvent::LocationsUpdated { locations: vec![] };
        assert!(source.emit(event.clone()).await);
        assert_eq!(rx.recv().await, Some(event));

        source.close();
        assert_eq!(rx.recv().await, None);
    }
}
