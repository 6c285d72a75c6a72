//! Top-level meeting client.
//!
//! Composes the event source, state store, session controller and join
//! orchestrator into the flow a front end drives:
//!
//! - `join` moves the phase `NotInMeeting -> Joining`; the runtime's
//!   meeting-start event moves it to `InMeeting`
//! - meeting-end deactivates the session and returns to `NotInMeeting`
//! - runtime errors outside a session are reported as SDK errors; inside a
//!   session the session's own handler classifies them
//!
//! The client holds three app-level subscriptions (meeting start, meeting
//! end, runtime error) for its whole lifetime and releases them on drop.

use crate::alerts::{Alert, AlertSink};
use crate::channel::{EventHandler, EventSource, SubscriptionHandle};
use crate::commands::CommandSink;
use crate::errors::ClientError;
use crate::events::{EventKind, RuntimeEvent};
use crate::join::{JoinOrchestrator, JoinedSession};
use crate::observability::metrics::record_runtime_error;
use crate::services::join_client::JoinCredentialsProvider;
use crate::session::SessionController;
use crate::store::{MeetingSnapshot, MeetingStateStore, SnapshotReceiver};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where the client is in the meeting flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingPhase {
    /// Showing the join form.
    NotInMeeting,
    /// Join requested; waiting for the runtime to start the meeting.
    Joining,
    /// The runtime reported the meeting as started.
    InMeeting,
}

/// Meeting client facade.
pub struct MeetingClient {
    sessions: Arc<SessionController>,
    orchestrator: JoinOrchestrator,
    commands: Arc<dyn CommandSink>,
    phase: Arc<watch::Sender<MeetingPhase>>,
    app_subscriptions: Vec<SubscriptionHandle>,
}

impl MeetingClient {
    /// Build a client and register its app-level subscriptions.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Subscription` if the event source is closed.
    pub fn new(
        source: Arc<dyn EventSource>,
        credentials: Arc<dyn JoinCredentialsProvider>,
        commands: Arc<dyn CommandSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self, ClientError> {
        let store = Arc::new(MeetingStateStore::new());
        let sessions = Arc::new(SessionController::new(
            Arc::clone(&source),
            store,
            Arc::clone(&alerts),
        ));
        let orchestrator = JoinOrchestrator::new(
            credentials,
            Arc::clone(&sessions),
            Arc::clone(&commands),
            Arc::clone(&alerts),
        );
        let (phase, _) = watch::channel(MeetingPhase::NotInMeeting);
        let phase = Arc::new(phase);

        let handlers: [(EventKind, EventHandler); 3] = [
            (
                EventKind::MeetingStart,
                meeting_start_handler(Arc::downgrade(&sessions), Arc::clone(&phase)),
            ),
            (
                EventKind::MeetingEnd,
                meeting_end_handler(Arc::downgrade(&sessions), Arc::clone(&phase)),
            ),
            (
                EventKind::RuntimeError,
                sdk_error_handler(Arc::downgrade(&sessions), alerts),
            ),
        ];

        let mut app_subscriptions = Vec::with_capacity(handlers.len());
        for (kind, handler) in handlers {
            match source.subscribe(kind, handler) {
                Ok(handle) => app_subscriptions.push(handle),
                Err(e) => {
                    for handle in &app_subscriptions {
                        handle.cancel();
                    }
                    return Err(ClientError::Subscription(e));
                }
            }
        }

        debug!(target: "mc_client.session", "Meeting client ready");

        Ok(Self {
            sessions,
            orchestrator,
            commands,
            phase,
            app_subscriptions,
        })
    }

    /// Join `meeting_name` as `user_name`.
    ///
    /// On failure an alert has already been shown and the phase is back to
    /// `NotInMeeting`.
    ///
    /// # Errors
    ///
    /// Returns the `ClientError` that ended the attempt.
    pub async fn join(
        &self,
        meeting_name: &str,
        user_name: &str,
    ) -> Result<JoinedSession, ClientError> {
        let previous = self.phase.send_replace(MeetingPhase::Joining);

        let result = self.orchestrator.join(meeting_name, user_name).await;

        match &result {
            Ok(_) => {}
            // A superseding teardown or attempt owns the phase now
            Err(ClientError::Superseded) => {}
            Err(_) => {
                // A rejected attempt does not disturb a session already running
                let restored = if self.sessions.is_active() {
                    previous
                } else {
                    MeetingPhase::NotInMeeting
                };
                self.phase.send_if_modified(|phase| {
                    if *phase == MeetingPhase::Joining && restored != MeetingPhase::Joining {
                        *phase = restored;
                        return true;
                    }
                    false
                });
            }
        }

        result
    }

    /// Flip the local microphone. Returns the requested muted state, or
    /// `None` when no session is active.
    pub fn toggle_mute(&self) -> Option<bool> {
        let snapshot = self.snapshot();
        snapshot.session()?;

        let muted = !snapshot.is_self_muted();
        self.commands.set_muted(muted);
        Some(muted)
    }

    /// Flip the local camera. Returns the requested camera state, or `None`
    /// when no session is active.
    pub fn toggle_camera(&self) -> Option<bool> {
        let snapshot = self.snapshot();
        snapshot.session()?;

        let enabled = !snapshot.has_self_video();
        self.commands.set_camera_enabled(enabled);
        Some(enabled)
    }

    /// Ask the runtime to leave. The session ends when the meeting-end event
    /// arrives. Returns false when no session is active.
    pub fn hang_up(&self) -> bool {
        if !self.sessions.is_active() {
            return false;
        }
        info!(target: "mc_client.session", "Leaving meeting");
        self.commands.leave();
        true
    }

    /// End the session immediately and invalidate any join in flight.
    pub fn teardown(&self) {
        let released = self.sessions.teardown();
        self.phase.send_replace(MeetingPhase::NotInMeeting);
        info!(target: "mc_client.session", released, "Meeting client torn down");
    }

    /// Current meeting phase.
    #[must_use]
    pub fn phase(&self) -> MeetingPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase changes.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<MeetingPhase> {
        self.phase.subscribe()
    }

    /// Copy of the current meeting snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MeetingSnapshot {
        self.sessions.store().snapshot()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.sessions.store().subscribe()
    }

    /// The session controller (exposed for inspection).
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionController> {
        &self.sessions
    }

    /// The state store.
    #[must_use]
    pub fn store(&self) -> &Arc<MeetingStateStore> {
        self.sessions.store()
    }
}

impl Drop for MeetingClient {
    fn drop(&mut self) {
        for handle in &self.app_subscriptions {
            handle.cancel();
        }
        self.sessions.teardown();
    }
}

fn meeting_start_handler(
    sessions: Weak<SessionController>,
    phase: Arc<watch::Sender<MeetingPhase>>,
) -> EventHandler {
    Arc::new(move |_: &RuntimeEvent| {
        let active = sessions.upgrade().is_some_and(|s| s.is_active());
        if !active {
            debug!(target: "mc_client.session", "Meeting start without active session ignored");
            return;
        }
        if phase.send_if_modified(|p| {
            let changed = *p != MeetingPhase::InMeeting;
            *p = MeetingPhase::InMeeting;
            changed
        }) {
            info!(target: "mc_client.session", "Meeting started");
        }
    })
}

fn meeting_end_handler(
    sessions: Weak<SessionController>,
    phase: Arc<watch::Sender<MeetingPhase>>,
) -> EventHandler {
    Arc::new(move |_: &RuntimeEvent| {
        let released = sessions.upgrade().map_or(0, |s| s.deactivate());

        let left = phase.send_if_modified(|p| {
            if released > 0 || *p == MeetingPhase::InMeeting {
                *p = MeetingPhase::NotInMeeting;
                return true;
            }
            false
        });

        if left {
            info!(target: "mc_client.session", released, "Meeting ended");
        }
    })
}

fn sdk_error_handler(
    sessions: Weak<SessionController>,
    alerts: Arc<dyn AlertSink>,
) -> EventHandler {
    Arc::new(move |event: &RuntimeEvent| {
        let RuntimeEvent::RuntimeError { kind } = event else {
            return;
        };
        // The session's own handler reports errors raised during a meeting.
        if sessions.upgrade().is_some_and(|s| s.is_active()) {
            return;
        }
        warn!(target: "mc_client.session", error = %kind, "Runtime error outside a meeting");
        record_runtime_error(kind.label());
        alerts.report(Alert::sdk_error(kind));
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::channel::EventChannel;
    use crate::errors::CredentialsError;
    use crate::services::join_client::JoinCredentials;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NoCredentials;

    #[async_trait]
    impl JoinCredentialsProvider for NoCredentials {
        async fn request_join(
            &self,
            _meeting_name: &str,
            _user_name: &str,
        ) -> Result<JoinCredentials, CredentialsError> {
            Err(CredentialsError::NotFound)
        }
    }

    #[derive(Default)]
    struct Commands(Mutex<Vec<&'static str>>);

    impl CommandSink for Commands {
        fn join(
            &self,
            _meeting: &crate::services::MeetingDescriptor,
            _attendee: &crate::services::AttendeeDescriptor,
        ) {
            self.0.lock().unwrap().push("join");
        }
        fn leave(&self) {
            self.0.lock().unwrap().push("leave");
        }
        fn set_muted(&self, _muted: bool) {
            self.0.lock().unwrap().push("set_muted");
        }
        fn set_camera_enabled(&self, _enabled: bool) {
            self.0.lock().unwrap().push("set_camera_enabled");
        }
    }

    #[derive(Default)]
    struct Alerts(Mutex<Vec<Alert>>);

    impl AlertSink for Alerts {
        fn report(&self, alert: Alert) {
            self.0.lock().unwrap().push(alert);
        }
    }

    fn client(channel: &EventChannel) -> (MeetingClient, Arc<Commands>, Arc<Alerts>) {
        let commands = Arc::new(Commands::default());
        let alerts = Arc::new(Alerts::default());
        let client = MeetingClient::new(
            Arc::new(channel.clone()),
            Arc::new(NoCredentials),
            commands.clone(),
            alerts.clone(),
        )
        .unwrap();
        (client, commands, alerts)
    }

    #[test]
    fn test_app_subscriptions_registered_and_released() {
        let channel = EventChannel::new();
        let (client, _, _) = client(&channel);

        assert_eq!(channel.subscriber_count(EventKind::MeetingStart), 1);
        assert_eq!(channel.subscriber_count(EventKind::MeetingEnd), 1);
        assert_eq!(channel.subscriber_count(EventKind::RuntimeError), 1);

        drop(client);
        assert_eq!(channel.subscriber_count(EventKind::MeetingStart), 0);
        assert_eq!(channel.subscriber_count(EventKind::RuntimeError), 0);
    }

    #[test]
    fn test_new_fails_on_closed_source() {
        let channel = EventChannel::new();
        channel.close();

        let result = MeetingClient::new(
            Arc::new(channel),
            Arc::new(NoCredentials),
            Arc::new(Commands::default()),
            Arc::new(Alerts::default()),
        );
        assert!(matches!(result, Err(ClientError::Subscription(_))));
    }

    #[test]
    fn test_controls_without_session_are_noops() {
        let channel = EventChannel::new();
        let (client, commands, _) = client(&channel);

        assert_eq!(client.toggle_mute(), None);
        assert_eq!(client.toggle_camera(), None);
        assert!(!client.hang_up());
        assert!(commands.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sdk_error_outside_session() {
        let channel = EventChannel::new();
        let (_client, _, alerts) = client(&channel);

        channel.deliver(&RuntimeEvent::runtime_error("camera unavailable"));

        let alerts = alerts.0.lock().unwrap();
        assert_eq!(
            *alerts,
            vec![Alert::new(crate::alerts::SDK_ERROR_TITLE, "camera unavailable")]
        );
    }

    #[test]
    fn test_meeting_start_without_session_is_ignored() {
        let channel = EventChannel::new();
        let (client, _, _) = client(&channel);

        channel.deliver(&RuntimeEvent::MeetingStart);
        assert_eq!(client.phase(), MeetingPhase::NotInMeeting);
    }

    #[tokio::test]
    async fn test_failed_join_returns_to_join_form() {
        let channel = EventChannel::new();
        let (client, commands, alerts) = client(&channel);

        let err = client.join("room1", "Alice").await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Credentials(CredentialsError::NotFound)
        ));
        assert_eq!(client.phase(), MeetingPhase::NotInMeeting);
        assert!(!client.sessions().is_active());
        assert!(commands.0.lock().unwrap().is_empty());
        assert_eq!(
            alerts.0.lock().unwrap().first().unwrap().title,
            crate::alerts::JOIN_FAILED_TITLE
        );
    }

    #[tokio::test]
    async fn test_blank_names_rejected_before_request() {
        let channel = EventChannel::new();
        let (client, _, alerts) = client(&channel);

        let err = client.join("  ", "Alice").await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert_eq!(
            alerts.0.lock().unwrap().first().unwrap().title,
            crate::alerts::MISSING_JOIN_FIELDS_TITLE
        );
        assert_eq!(client.phase(), MeetingPhase::NotInMeeting);
    }
}
