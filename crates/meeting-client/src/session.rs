//! Session lifecycle controller.
//!
//! Two states: `Idle` (no subscriptions) and `Active` (one subscription per
//! session event kind). Activation is all-or-nothing; deactivation cancels
//! every handle and resets the store, and is safe to repeat.
//!
//! # Generations
//!
//! Every join attempt takes a fresh generation from
//! [`SessionController::begin_attempt`]. Activation only proceeds if the
//! attempt's generation is still the latest, so a credential response that
//! arrives after [`SessionController::teardown`] (or after a newer attempt)
//! cannot bring subscriptions back. Session handlers carry the generation
//! they were registered under and the store drops their events once the
//! session has moved on.

use crate::alerts::{Alert, AlertSink};
use crate::channel::{EventHandler, EventSource, SubscriptionHandle};
use crate::errors::{ChannelError, ClientError};
use crate::events::{EventKind, RuntimeEvent};
use crate::observability::metrics::record_runtime_error;
use crate::store::{MeetingStateStore, SessionInfo};
use common::types::AttendeeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

enum LifecycleState {
    Idle,
    Active {
        generation: u64,
        handles: HashMap<EventKind, SubscriptionHandle>,
    },
}

/// Owns the session's event subscriptions.
pub struct SessionController {
    source: Arc<dyn EventSource>,
    store: Arc<MeetingStateStore>,
    alerts: Arc<dyn AlertSink>,
    generation: AtomicU64,
    state: Mutex<LifecycleState>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        store: Arc<MeetingStateStore>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            source,
            store,
            alerts,
            generation: AtomicU64::new(0),
            state: Mutex::new(LifecycleState::Idle),
        }
    }

    fn state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The store this controller feeds.
    #[must_use]
    pub fn store(&self) -> &Arc<MeetingStateStore> {
        &self.store
    }

    /// Whether a session is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(*self.state(), LifecycleState::Active { .. })
    }

    /// Generation of the active session, if any.
    #[must_use]
    pub fn active_generation(&self) -> Option<u64> {
        match *self.state() {
            LifecycleState::Active { generation, .. } => Some(generation),
            LifecycleState::Idle => None,
        }
    }

    /// Whether `generation` is still the latest attempt.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Start a new join attempt and return its generation.
    ///
    /// Any earlier attempt still in flight is superseded.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AlreadyActive` while a session is active.
    pub fn begin_attempt(&self) -> Result<u64, ClientError> {
        let state = self.state();
        if matches!(*state, LifecycleState::Active { .. }) {
            return Err(ClientError::AlreadyActive);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: "mc_client.session", generation, "Join attempt started");
        Ok(generation)
    }

    /// Transition Idle -> Active for the attempt with `generation`.
    ///
    /// Starts a fresh session in the store and subscribes every session
    /// event kind. If any subscription fails, the ones already acquired are
    /// cancelled and the store is reset before returning.
    ///
    /// # Errors
    ///
    /// - `ClientError::Superseded` if a newer attempt or a teardown happened
    /// - `ClientError::AlreadyActive` if a session is already active
    /// - `ClientError::Subscription` if a subscription could not be acquired
    pub fn activate(
        &self,
        generation: u64,
        self_attendee_id: AttendeeId,
        meeting_title: &str,
    ) -> Result<(), ClientError> {
        let mut state = self.state();

        // Checked under the state lock; teardown bumps the generation before
        // taking it, so a teardown either lands first or deactivates us.
        if !self.is_current(generation) {
            info!(target: "mc_client.session", generation, "Activation skipped, attempt superseded");
            return Err(ClientError::Superseded);
        }
        if matches!(*state, LifecycleState::Active { .. }) {
            return Err(ClientError::AlreadyActive);
        }

        self.store.begin_session(SessionInfo {
            generation,
            self_attendee_id,
            meeting_title: meeting_title.to_string(),
        });

        match self.subscribe_all(generation) {
            Ok(handles) => {
                info!(
                    target: "mc_client.session",
                    generation,
                    subscriptions = handles.len(),
                    "Session activated"
                );
                *state = LifecycleState::Active { generation, handles };
                Ok(())
            }
            Err(e) => {
                self.store.end_session(generation);
                warn!(target: "mc_client.session", generation, error = %e, "Session activation failed");
                Err(ClientError::Subscription(e))
            }
        }
    }

    fn subscribe_all(
        &self,
        generation: u64,
    ) -> Result<HashMap<EventKind, SubscriptionHandle>, ChannelError> {
        let mut handles = HashMap::with_capacity(EventKind::SESSION.len());

        for kind in EventKind::SESSION {
            match self.source.subscribe(kind, self.handler_for(kind, generation)) {
                Ok(handle) => {
                    handles.insert(kind, handle);
                }
                Err(e) => {
                    for handle in handles.values() {
                        handle.cancel();
                    }
                    debug!(
                        target: "mc_client.session",
                        kind = %kind,
                        released = handles.len(),
                        "Partial subscriptions released"
                    );
                    return Err(e);
                }
            }
        }

        Ok(handles)
    }

    fn handler_for(&self, kind: EventKind, generation: u64) -> EventHandler {
        let store = Arc::clone(&self.store);

        if kind != EventKind::RuntimeError {
            return Arc::new(move |event: &RuntimeEvent| {
                store.apply(generation, event);
            });
        }

        let alerts = Arc::clone(&self.alerts);
        Arc::new(move |event: &RuntimeEvent| {
            if !store.apply(generation, event).is_current() {
                return;
            }
            if let RuntimeEvent::RuntimeError { kind } = event {
                warn!(
                    target: "mc_client.session",
                    generation,
                    error = %kind,
                    "Runtime error during meeting"
                );
                record_runtime_error(kind.label());
                alerts.report(Alert::for_runtime_error(kind));
            }
        })
    }

    /// Transition Active -> Idle.
    ///
    /// Cancels every subscription and resets the store. Returns the number
    /// of subscriptions released; zero if already idle.
    pub fn deactivate(&self) -> usize {
        let previous = std::mem::replace(&mut *self.state(), LifecycleState::Idle);

        let LifecycleState::Active {
            generation,
            handles,
        } = previous
        else {
            return 0;
        };

        for handle in handles.values() {
            handle.cancel();
        }
        // Scoped to our generation: a session activated while we were
        // cancelling keeps its snapshot.
        self.store.end_session(generation);

        info!(
            target: "mc_client.session",
            generation,
            released = handles.len(),
            "Session deactivated"
        );
        handles.len()
    }

    /// Run `f` while the session for `generation` is active and current.
    ///
    /// `f` runs under the state lock, so a concurrent teardown either lands
    /// before (and `f` is skipped) or waits until `f` has returned. Returns
    /// whether `f` ran.
    pub fn with_active_session(&self, generation: u64, f: impl FnOnce()) -> bool {
        let state = self.state();
        let active = matches!(
            *state,
            LifecycleState::Active { generation: current, .. } if current == generation
        );
        if !active || !self.is_current(generation) {
            debug!(target: "mc_client.session", generation, "Session no longer current");
            return false;
        }
        f();
        true
    }

    /// Deactivate and invalidate any join attempt still in flight.
    pub fn teardown(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.deactivate()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::channel::EventChannel;
    use crate::events::VideoTile;

    #[derive(Default)]
    struct Collected(Mutex<Vec<Alert>>);

    impl AlertSink for Collected {
        fn report(&self, alert: Alert) {
            self.0.lock().unwrap().push(alert);
        }
    }

    /// Event source that fails the Nth subscription.
    struct FailingSource {
        inner: EventChannel,
        fail_at: usize,
        calls: Mutex<usize>,
    }

    impl EventSource for FailingSource {
        fn subscribe(
            &self,
            kind: EventKind,
            handler: EventHandler,
        ) -> Result<SubscriptionHandle, ChannelError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == self.fail_at {
                return Err(ChannelError::Closed);
            }
            self.inner.subscribe(kind, handler)
        }
    }

    fn controller(channel: &EventChannel) -> (SessionController, Arc<Collected>) {
        let alerts = Arc::new(Collected::default());
        let controller = SessionController::new(
            Arc::new(channel.clone()),
            Arc::new(MeetingStateStore::new()),
            alerts.clone(),
        );
        (controller, alerts)
    }

    fn total_subscribers(channel: &EventChannel) -> usize {
        EventKind::SESSION
            .iter()
            .map(|kind| channel.subscriber_count(*kind))
            .sum()
    }

    #[test]
    fn test_activate_subscribes_all_session_kinds() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);

        let generation = controller.begin_attempt().unwrap();
        controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap();

        assert!(controller.is_active());
        assert_eq!(controller.active_generation(), Some(generation));
        for kind in EventKind::SESSION {
            assert_eq!(channel.subscriber_count(kind), 1, "kind {kind}");
        }
        assert_eq!(channel.subscriber_count(EventKind::MeetingStart), 0);
        assert_eq!(
            controller.store().snapshot().meeting_title(),
            Some("room1")
        );
    }

    #[test]
    fn test_events_flow_into_store() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);

        let generation = controller.begin_attempt().unwrap();
        controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap();

        channel.deliver(&RuntimeEvent::attendee_join("a2", "q#Bob"));
        channel.deliver(&RuntimeEvent::VideoTileAdd(VideoTile::local(7)));

        let snapshot = controller.store().snapshot();
        assert!(snapshot.roster().contains(&AttendeeId::from("a2")));
        assert!(snapshot.has_self_video());
    }

    #[test]
    fn test_deactivate_releases_everything_and_is_repeatable() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);

        let generation = controller.begin_attempt().unwrap();
        controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap();
        channel.deliver(&RuntimeEvent::attendee_join("a2", "q#Bob"));

        assert_eq!(controller.deactivate(), EventKind::SESSION.len());
        assert_eq!(controller.deactivate(), 0);

        assert!(!controller.is_active());
        assert_eq!(total_subscribers(&channel), 0);
        assert!(controller.store().snapshot().session().is_none());

        // Late delivery after deactivation is harmless
        assert_eq!(channel.deliver(&RuntimeEvent::attendee_join("a3", "r#Cy")), 0);
        assert!(controller.store().snapshot().roster().is_empty());
    }

    #[test]
    fn test_partial_subscription_failure_releases_acquired_handles() {
        let channel = EventChannel::new();
        let alerts = Arc::new(Collected::default());
        let source = FailingSource {
            inner: channel.clone(),
            fail_at: 4,
            calls: Mutex::new(0),
        };
        let controller = SessionController::new(
            Arc::new(source),
            Arc::new(MeetingStateStore::new()),
            alerts,
        );

        let generation = controller.begin_attempt().unwrap();
        let err = controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap_err();

        assert!(matches!(err, ClientError::Subscription(ChannelError::Closed)));
        assert!(!controller.is_active());
        assert_eq!(total_subscribers(&channel), 0);
        assert!(controller.store().snapshot().session().is_none());
    }

    #[test]
    fn test_superseded_attempt_does_not_activate() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);

        let first = controller.begin_attempt().unwrap();
        let second = controller.begin_attempt().unwrap();
        assert!(!controller.is_current(first));

        let err = controller
            .activate(first, AttendeeId::from("a1"), "room1")
            .unwrap_err();
        assert!(matches!(err, ClientError::Superseded));
        assert_eq!(total_subscribers(&channel), 0);

        controller
            .activate(second, AttendeeId::from("a1"), "room1")
            .unwrap();
        assert!(controller.is_active());
    }

    #[test]
    fn test_teardown_invalidates_in_flight_attempt() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);

        let generation = controller.begin_attempt().unwrap();
        assert_eq!(controller.teardown(), 0);

        assert!(matches!(
            controller.activate(generation, AttendeeId::from("a1"), "room1"),
            Err(ClientError::Superseded)
        ));
        assert!(!controller.is_active());
    }

    #[test]
    fn test_begin_attempt_while_active_is_rejected() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);

        let generation = controller.begin_attempt().unwrap();
        controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap();

        assert!(matches!(
            controller.begin_attempt(),
            Err(ClientError::AlreadyActive)
        ));
        assert!(controller.is_current(generation));
    }

    #[test]
    fn test_runtime_errors_are_classified() {
        let channel = EventChannel::new();
        let (controller, alerts) = controller(&channel);

        let generation = controller.begin_attempt().unwrap();
        controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap();

        channel.deliver(&RuntimeEvent::runtime_error("maximum_concurrent_video_reached"));
        channel.deliver(&RuntimeEvent::runtime_error("audio device lost"));

        let alerts = alerts.0.lock().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts.first().unwrap().title, crate::alerts::VIDEO_LIMIT_TITLE);
        assert_eq!(alerts.get(1).unwrap().message, "audio device lost");
    }

    #[test]
    fn test_stale_handler_does_not_touch_next_session() {
        let channel = EventChannel::new();
        let (controller, alerts) = controller(&channel);

        let first = controller.begin_attempt().unwrap();
        controller
            .activate(first, AttendeeId::from("a1"), "room1")
            .unwrap();
        let stale = controller.handler_for(EventKind::RuntimeError, first);
        let stale_join = controller.handler_for(EventKind::AttendeeJoin, first);
        controller.deactivate();

        let second = controller.begin_attempt().unwrap();
        controller
            .activate(second, AttendeeId::from("a9"), "room2")
            .unwrap();

        stale(&RuntimeEvent::runtime_error("late"));
        stale_join(&RuntimeEvent::attendee_join("a2", "q#Bob"));

        assert!(alerts.0.lock().unwrap().is_empty());
        assert!(controller.store().snapshot().roster().is_empty());
    }

    #[test]
    fn test_drop_releases_subscriptions() {
        let channel = EventChannel::new();
        {
            let (controller, _) = controller(&channel);
            let generation = controller.begin_attempt().unwrap();
            controller
                .activate(generation, AttendeeId::from("a1"), "room1")
                .unwrap();
            assert_eq!(total_subscribers(&channel), EventKind::SESSION.len());
        }
        assert_eq!(total_subscribers(&channel), 0);
    }

    #[test]
    fn test_with_active_session_skips_after_teardown() {
        let channel = EventChannel::new();
        let (controller, _) = controller(&channel);
        let generation = controller.begin_attempt().unwrap();
        controller
            .activate(generation, AttendeeId::from("a1"), "room1")
            .unwrap();

        let mut runs = 0;
        assert!(controller.with_active_session(generation, || runs += 1));
        assert!(!controller.with_active_session(generation + 1, || runs += 1));

        controller.teardown();
        assert!(!controller.with_active_session(generation, || runs += 1));
        assert_eq!(runs, 1);
    }
}
