//! Meeting state store.
//!
//! Sole owner of the [`MeetingSnapshot`]. Readers get whole snapshots and
//! change notifications through [`SnapshotReceiver`]; writers submit whole
//! transitions. No partially applied event is ever observable.
//!
//! Every event is submitted together with the generation of the session
//! that subscribed for it. Events whose generation no longer matches the
//! active session are dropped, so callbacks that outlive their session
//! cannot touch the next one.

pub mod snapshot;

pub use snapshot::{AttendeeRow, MeetingSnapshot, SessionInfo};

use crate::errors::ChannelError;
use crate::events::RuntimeEvent;
use crate::observability::metrics::{record_event_applied, record_event_ignored, set_roster_size};
use tokio::sync::watch;
use tracing::{debug, info};

/// Result of submitting an event to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Applied and the snapshot changed.
    Changed,
    /// Applied but the snapshot was already in the resulting state.
    Unchanged,
    /// The event belongs to a session that has ended.
    StaleGeneration,
    /// No session is active.
    NoSession,
}

impl ApplyOutcome {
    /// Whether the event was accepted for the active session.
    #[must_use]
    pub fn is_current(self) -> bool {
        matches!(self, ApplyOutcome::Changed | ApplyOutcome::Unchanged)
    }
}

/// Watch-backed owner of the meeting snapshot.
#[derive(Debug)]
pub struct MeetingStateStore {
    sender: watch::Sender<MeetingSnapshot>,
}

impl Default for MeetingStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MeetingStateStore {
    /// Create a store holding the idle snapshot.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(MeetingSnapshot::default());
        Self { sender }
    }

    /// Copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MeetingSnapshot {
        self.sender.borrow().clone()
    }

    /// Generation of the active session, if any.
    #[must_use]
    pub fn current_generation(&self) -> Option<u64> {
        self.sender.borrow().generation()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver {
        SnapshotReceiver(self.sender.subscribe())
    }

    /// Replace the snapshot with an empty one for a new session.
    pub fn begin_session(&self, session: SessionInfo) {
        info!(
            target: "mc_client.store",
            generation = session.generation,
            self_attendee_id = %session.self_attendee_id,
            "Meeting session started"
        );
        self.sender.send_replace(MeetingSnapshot::started(session));
        set_roster_size(0);
    }

    /// Reset to the idle snapshot if the session with `generation` is the
    /// current one.
    ///
    /// Returns false if idle or if a newer session has already started.
    pub fn end_session(&self, generation: u64) -> bool {
        let ended = self.sender.send_if_modified(|snapshot| {
            if snapshot.generation() != Some(generation) {
                return false;
            }
            *snapshot = MeetingSnapshot::default();
            true
        });

        if ended {
            info!(target: "mc_client.store", generation, "Meeting session ended, snapshot reset");
            set_roster_size(0);
        } else {
            debug!(
                target: "mc_client.store",
                generation,
                current = ?self.current_generation(),
                "End of session ignored, not the current session"
            );
        }
        ended
    }

    /// Apply `event` on behalf of the session with `generation`.
    pub fn apply(&self, generation: u64, event: &RuntimeEvent) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::NoSession;
        let mut roster_size = 0;

        self.sender.send_if_modified(|snapshot| {
            match snapshot.generation() {
                None => false,
                Some(current) if current != generation => {
                    outcome = ApplyOutcome::StaleGeneration;
                    false
                }
                Some(_) => {
                    let changed = snapshot.apply_in_place(event);
                    roster_size = snapshot.roster().len();
                    outcome = if changed {
                        ApplyOutcome::Changed
                    } else {
                        ApplyOutcome::Unchanged
                    };
                    changed
                }
            }
        });

        let kind = event.kind().as_str();
        match outcome {
            ApplyOutcome::Changed | ApplyOutcome::Unchanged => {
                debug!(
                    target: "mc_client.store",
                    kind,
                    generation,
                    changed = outcome == ApplyOutcome::Changed,
                    "Event applied"
                );
                record_event_applied(kind);
                set_roster_size(roster_size);
            }
            ApplyOutcome::StaleGeneration => {
                debug!(target: "mc_client.store", kind, generation, "Stale event ignored");
                record_event_ignored("stale_generation");
            }
            ApplyOutcome::NoSession => {
                debug!(target: "mc_client.store", kind, generation, "Event ignored, no active session");
                record_event_ignored("no_session");
            }
        }

        outcome
    }
}

/// Receiver for snapshot changes.
///
/// Intermediate snapshots may be skipped when several transitions land
/// between two reads; the receiver always observes the latest one.
#[derive(Debug, Clone)]
pub struct SnapshotReceiver(watch::Receiver<MeetingSnapshot>);

impl SnapshotReceiver {
    /// Copy of the latest snapshot.
    #[must_use]
    pub fn current(&self) -> MeetingSnapshot {
        self.0.borrow().clone()
    }

    /// Wait for the next change and return the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Closed` if the store was dropped.
    pub async fn changed(&mut self) -> Result<MeetingSnapshot, ChannelError> {
        self.0.changed().await.map_err(|_| ChannelError::Closed)?;
        Ok(self.0.borrow_and_update().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::events::VideoTile;
    use common::types::AttendeeId;

    fn session(generation: u64) -> SessionInfo {
        SessionInfo {
            generation,
            self_attendee_id: AttendeeId::from("a1"),
            meeting_title: "room1".to_string(),
        }
    }

    #[test]
    fn test_events_ignored_without_session() {
        let store = MeetingStateStore::new();
        let outcome = store.apply(1, &RuntimeEvent::attendee_join("a1", "p#Alice"));

        assert_eq!(outcome, ApplyOutcome::NoSession);
        assert_eq!(store.snapshot(), MeetingSnapshot::default());
    }

    #[test]
    fn test_apply_for_current_generation() {
        let store = MeetingStateStore::new();
        store.begin_session(session(3));

        assert_eq!(
            store.apply(3, &RuntimeEvent::attendee_join("a1", "p#Alice")),
            ApplyOutcome::Changed
        );
        assert_eq!(
            store.apply(3, &RuntimeEvent::attendee_join("a1", "p#Alice")),
            ApplyOutcome::Unchanged
        );
        assert_eq!(store.snapshot().roster().len(), 1);
        assert_eq!(store.current_generation(), Some(3));
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let store = MeetingStateStore::new();
        store.begin_session(session(2));

        let outcome = store.apply(1, &RuntimeEvent::VideoTileAdd(VideoTile::remote(4)));

        assert_eq!(outcome, ApplyOutcome::StaleGeneration);
        assert!(!outcome.is_current());
        assert!(store.snapshot().video_tiles().is_empty());
    }

    #[test]
    fn test_end_session_resets_everything() {
        let store = MeetingStateStore::new();
        store.begin_session(session(1));
        store.apply(1, &RuntimeEvent::attendee_join("a2", "q#Bob"));

        assert!(store.end_session(1));
        assert_eq!(store.snapshot(), MeetingSnapshot::default());
        assert!(!store.end_session(1));

        // Names do not carry over into the next session
        store.begin_session(session(2));
        assert_eq!(
            store.snapshot().display_name_for(&AttendeeId::from("a2")),
            "a2"
        );
    }

    #[test]
    fn test_end_session_leaves_newer_session_alone() {
        let store = MeetingStateStore::new();
        store.begin_session(session(2));
        store.apply(2, &RuntimeEvent::attendee_join("a1", "p#Alice"));

        // A late reset from the previous session
        assert!(!store.end_session(1));

        assert_eq!(store.current_generation(), Some(2));
        assert_eq!(store.snapshot().roster().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = MeetingStateStore::new();
        let mut receiver = store.subscribe();
        assert!(receiver.current().session().is_none());

        store.begin_session(session(1));
        let snapshot = receiver.changed().await.unwrap();
        assert_eq!(snapshot.generation(), Some(1));

        store.apply(1, &RuntimeEvent::attendee_mute("a1"));
        let snapshot = receiver.changed().await.unwrap();
        assert!(snapshot.is_self_muted());
    }

    #[tokio::test]
    async fn test_unchanged_apply_does_not_notify() {
        let store = MeetingStateStore::new();
        store.begin_session(session(1));
        store.apply(1, &RuntimeEvent::attendee_mute("a1"));

        let mut receiver = store.subscribe();
        store.apply(1, &RuntimeEvent::attendee_mute("a1"));

        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            receiver.changed(),
        )
        .await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_receiver_reports_closed_store() {
        let store = MeetingStateStore::new();
        let mut receiver = store.subscribe();
        drop(store);

        assert_eq!(receiver.changed().await.unwrap_err(), ChannelError::Closed);
    }
}
