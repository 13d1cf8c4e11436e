//! Monitoring coordinator.
//!
//! The coordinator owns the throttle state (when and where the last reminder
//! fired) and the monitoring lifecycle. It consumes [`LocationEvent`]s,
//! consults the [`MovementPolicy`] and hands reminders to a
//! [`NotificationSender`].
//!
//! # Concurrency
//!
//! Events may arrive from several threads at once. Every read-decide-write of
//! the throttle state happens under one mutex, so two near-simultaneous fixes
//! cannot both pass the policy against stale state. Calls out to the location
//! source happen after the state lock is released but under a second lock
//! taken before it is, so the source sees them in decision order. Sources must
//! not call back into the coordinator synchronously from those calls.
//! Notification work is spawned on the tokio runtime the coordinator was
//! built on and never awaited.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use leavecheck_core::clock::SystemClock;
//! use leavecheck_core::coordinator::MonitoringCoordinator;
//! use leavecheck_core::location::LocationSource;
//! use leavecheck_core::notification::NotificationSender;
//! use leavecheck_core::settings::SettingsProvider;
//!
//! # async fn assemble(
//! #     source: Arc<dyn LocationSource>,
//! #     sender: Arc<dyn NotificationSender>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SettingsProvider::default();
//! let coordinator = Arc::new(MonitoringCoordinator::new(
//!     source,
//!     sender,
//!     settings.subscribe(),
//!     Arc::new(SystemClock),
//! )?);
//!
//! let _pump = coordinator.attach(64);
//! coordinator.start();
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::CoordinatorError;
use crate::geo::GeoPoint;
use crate::location::{LocationEvent, LocationSource};
use crate::notification::{
    action_catalog, NotificationSender, ReminderRequest, CATEGORY_IDENTIFIER,
};
use crate::policy::MovementPolicy;
use crate::settings::Settings;
use crate::types::{AuthorizationState, NotificationMoment, TimedLocation, Visit};

/// Result of calling [`MonitoringCoordinator::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyStarted,
}

/// Why an event produced no decision at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A location batch with no fixes.
    EmptyBatch,
    /// A visit whose coordinate was out of range.
    InvalidCoordinate,
    /// Not a movement event.
    NotMovement,
}

/// Result of feeding one event to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOutcome {
    /// A reminder was dispatched.
    Notified { request_id: Uuid },
    /// The policy held the reminder back.
    Suppressed,
    /// The event carried nothing to evaluate.
    Ignored(IgnoreReason),
}

impl MovementOutcome {
    #[must_use]
    pub fn is_notified(&self) -> bool {
        matches!(self, Self::Notified { .. })
    }
}

/// Mutable state, always accessed under the coordinator mutex.
#[derive(Debug, Default)]
struct CoordinatorState {
    last_notification: Option<NotificationMoment>,
    has_started: bool,
    monitoring_active: bool,
    authorization: AuthorizationState,
    /// Set once an authorization event has been handled; from then on the
    /// event stream, not a status query, is the source of truth.
    authorization_seen: bool,
}

/// Follow-up calls to the location source, decided under the lock and
/// performed after it is released.
#[derive(Debug, Default)]
struct SourceActions {
    request_when_in_use: bool,
    request_always: bool,
    start_monitoring: bool,
    stop_monitoring: bool,
}

/// Turns location events into throttled reminders.
pub struct MonitoringCoordinator {
    location: Arc<dyn LocationSource>,
    notifier: Arc<dyn NotificationSender>,
    settings: watch::Receiver<Settings>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    state: Mutex<CoordinatorState>,
    source_calls: Mutex<()>,
}

impl MonitoringCoordinator {
    /// Assembles a coordinator from its collaborators.
    ///
    /// Must be called from within a tokio runtime; notification work is
    /// spawned on that runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NoRuntime`] outside a tokio runtime.
    pub fn new(
        location: Arc<dyn LocationSource>,
        notifier: Arc<dyn NotificationSender>,
        settings: watch::Receiver<Settings>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoordinatorError> {
        let runtime = Handle::try_current()?;
        Ok(Self {
            location,
            notifier,
            settings,
            clock,
            runtime,
            state: Mutex::new(CoordinatorState::default()),
            source_calls: Mutex::new(()),
        })
    }

    /// Registers with the location source and spawns the event pump.
    ///
    /// The pump holds only a weak reference to the coordinator. It exits when
    /// the source drops its sender or the coordinator is dropped.
    pub fn attach(self: &Arc<Self>, capacity: usize) -> JoinHandle<()> {
        self.spawn_pump(capacity, None)
    }

    /// Like [`attach`](Self::attach), but reports the outcome of every
    /// handled event on `outcomes`, in delivery order.
    pub fn attach_with_outcomes(
        self: &Arc<Self>,
        capacity: usize,
        outcomes: mpsc::UnboundedSender<MovementOutcome>,
    ) -> JoinHandle<()> {
        self.spawn_pump(capacity, Some(outcomes))
    }

    fn spawn_pump(
        self: &Arc<Self>,
        capacity: usize,
        outcomes: Option<mpsc::UnboundedSender<MovementOutcome>>,
    ) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::channel(capacity.max(1));
        self.location.subscribe(tx);

        let weak: Weak<Self> = Arc::downgrade(self);
        self.runtime.spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(coordinator) = weak.upgrade() else {
                    debug!("Coordinator dropped, stopping event pump");
                    break;
                };
                let outcome = coordinator.handle_event(event);
                if let Some(outcomes) = &outcomes {
                    // A closed observer only loses reports, not events.
                    let _ = outcomes.send(outcome);
                }
            }
            debug!("Location event pump finished");
        })
    }

    /// Starts the coordinator. Only the first call has any effect.
    ///
    /// Registers the reminder category and requests notification permission
    /// in the background, asks the location source for the next permission
    /// tier and starts monitoring if already authorized.
    ///
    /// If an authorization event has already been handled, its status wins
    /// over the one queried from the source here, and no second upgrade
    /// request is made for it.
    pub fn start(&self) -> StartOutcome {
        let queried = self.location.authorization_status();

        let mut state = self.lock_state();
        if state.has_started {
            debug!("Coordinator already started");
            return StartOutcome::AlreadyStarted;
        }
        state.has_started = true;
        let from_query = !state.authorization_seen;
        if from_query {
            state.authorization = queried;
        }
        let status = state.authorization;

        let mut actions = Self::monitoring_actions(&mut state, status);
        match status {
            AuthorizationState::NotDetermined => actions.request_when_in_use = true,
            // A handled transition into the limited tier has already asked.
            AuthorizationState::AuthorizedLimited => actions.request_always = from_query,
            _ => {}
        }

        info!(authorization = %status, "Starting monitoring coordinator");
        self.prepare_notifications();
        self.apply(state, actions);

        StartOutcome::Started
    }

    /// Reacts to a permission change reported by the location source.
    ///
    /// Starts or stops monitoring to match `status`. On a transition into
    /// [`AuthorizationState::AuthorizedLimited`] it also asks once for the
    /// always-on tier; a repeated event with the same status does not ask
    /// again.
    pub fn on_authorization_changed(&self, status: AuthorizationState) {
        let mut state = self.lock_state();
        let previous = std::mem::replace(&mut state.authorization, status);
        state.authorization_seen = true;

        let mut actions = Self::monitoring_actions(&mut state, status);
        actions.request_always =
            status == AuthorizationState::AuthorizedLimited && previous != status;

        info!(authorization = %status, "Location authorization changed");
        self.apply(state, actions);
    }

    /// Evaluates the most recent fix of a batch.
    pub fn on_location_update(&self, locations: &[TimedLocation]) -> MovementOutcome {
        let Some(latest) = locations.last() else {
            debug!("Ignoring empty location batch");
            return MovementOutcome::Ignored(IgnoreReason::EmptyBatch);
        };
        self.evaluate_movement(latest.point, self.clock.now())
    }

    /// Evaluates a visit. Ill-formed coordinates are dropped without touching state.
    pub fn on_visit(&self, visit: &Visit) -> MovementOutcome {
        match visit.point() {
            Ok(point) => self.evaluate_movement(point, self.clock.now()),
            Err(e) => {
                warn!(error = %e, "Dropping visit with invalid coordinate");
                MovementOutcome::Ignored(IgnoreReason::InvalidCoordinate)
            }
        }
    }

    /// Dispatches any location event to its handler.
    pub fn handle_event(&self, event: LocationEvent) -> MovementOutcome {
        match event {
            LocationEvent::AuthorizationChanged { status } => {
                self.on_authorization_changed(status);
                MovementOutcome::Ignored(IgnoreReason::NotMovement)
            }
            LocationEvent::LocationsUpdated { locations } => self.on_location_update(&locations),
            LocationEvent::Visited { visit } => self.on_visit(&visit),
        }
    }

    /// When and where the last reminder fired, if any.
    #[must_use]
    pub fn throttle_state(&self) -> Option<NotificationMoment> {
        self.lock_state().last_notification
    }

    /// Last authorization status seen by the coordinator.
    #[must_use]
    pub fn authorization(&self) -> AuthorizationState {
        self.lock_state().authorization
    }

    /// Whether the coordinator has asked the source to monitor.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.lock_state().monitoring_active
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.lock_state().has_started
    }

    /// The settings snapshot in effect right now.
    #[must_use]
    pub fn current_settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    fn evaluate_movement(&self, location: GeoPoint, now: DateTime<Utc>) -> MovementOutcome {
        let settings = self.current_settings();
        let policy = MovementPolicy::from_settings(&settings);

        let request = {
            let mut state = self.lock_state();
            let last = state.last_notification;
            let fire = policy.should_notify(
                last.map(|m| m.at),
                last.as_ref().map(|m| &m.location),
                &location,
                now,
            );
            if !fire {
                debug!(
                    latitude = location.latitude(),
                    longitude = location.longitude(),
                    "Reminder suppressed by movement policy"
                );
                return MovementOutcome::Suppressed;
            }

            state.last_notification = Some(NotificationMoment { at: now, location });
            ReminderRequest::new(settings.enabled_items().clone(), now)
        };

        let request_id = request.id;
        info!(
            request_id = %request_id,
            items = request.items.len(),
            latitude = location.latitude(),
            longitude = location.longitude(),
            "Dispatching reminder"
        );
        self.dispatch(request);

        MovementOutcome::Notified { request_id }
    }

    fn dispatch(&self, request: ReminderRequest) {
        let notifier = Arc::clone(&self.notifier);
        self.runtime.spawn(async move {
            let request_id = request.id;
            if let Err(e) = notifier.send(request).await {
                warn!(request_id = %request_id, error = %e, "Reminder delivery failed");
            }
        });
    }

    fn prepare_notifications(&self) {
        let notifier = Arc::clone(&self.notifier);
        self.runtime.spawn(async move {
            if let Err(e) = notifier
                .configure_categories(CATEGORY_IDENTIFIER, &action_catalog())
                .await
            {
                warn!(error = %e, "Notification category registration failed");
            }
            match notifier.request_authorization().await {
                Ok(true) => info!("Notification permission granted"),
                Ok(false) => warn!("Notification permission not granted"),
                Err(e) => warn!(error = %e, "Notification permission request failed"),
            }
        });
    }

    fn monitoring_actions(state: &mut CoordinatorState, status: AuthorizationState) -> SourceActions {
        let mut actions = SourceActions::default();
        if status.is_authorized() && !state.monitoring_active {
            state.monitoring_active = true;
            actions.start_monitoring = true;
        } else if !status.is_authorized() && state.monitoring_active {
            state.monitoring_active = false;
            actions.stop_monitoring = true;
        }
        actions
    }

    /// Performs `actions` against the location source.
    ///
    /// The source-call lock is taken before `state` is released, so calls
    /// from concurrent decisions reach the source in the order they were made.
    fn apply(&self, state: MutexGuard<'_, CoordinatorState>, actions: SourceActions) {
        let _ordered = self
            .source_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(state);

        if actions.start_monitoring {
            info!("Starting continuous location monitoring");
            self.location.start_continuous_monitoring();
        }
        if actions.stop_monitoring {
            info!("Stopping continuous location monitoring");
            self.location.stop_continuous_monitoring();
        }
        if actions.request_when_in_use {
            self.location.request_when_in_use_authorization();
        }
        if actions.request_always {
            debug!("Requesting always-on location authorization");
            self.location.request_always_authorization();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MonitoringCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringCoordinator")
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}
