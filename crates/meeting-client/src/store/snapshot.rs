//! Meeting snapshot and its transition function.
//!
//! [`MeetingSnapshot::apply`] is pure: `(snapshot, event) -> snapshot`. Every
//! transition is idempotent and none depends on events of another kind
//! having arrived first, because the runtime redelivers after reconnects and
//! gives no ordering across kinds.

use crate::events::{RuntimeEvent, VideoTile};
use common::types::{AttendeeId, ExternalUserId, TileId};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of the active meeting session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Join attempt this session belongs to.
    pub generation: u64,
    /// Attendee id of the local participant, from the join response.
    pub self_attendee_id: AttendeeId,
    /// Meeting name as entered by the user.
    pub meeting_title: String,
}

/// One row of the attendee list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeRow {
    pub id: AttendeeId,
    pub name: String,
    pub muted: bool,
}

/// Complete renderable state of one meeting session.
///
/// The default value is the idle snapshot: no session, everything empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingSnapshot {
    session: Option<SessionInfo>,
    roster: BTreeSet<AttendeeId>,
    /// Append-only for the session; departed attendees keep their names.
    names: BTreeMap<AttendeeId, String>,
    /// May contain ids not in `roster`.
    muted: BTreeSet<AttendeeId>,
    video_tiles: BTreeSet<TileId>,
    screen_share: Option<TileId>,
    self_video: bool,
}

impl MeetingSnapshot {
    /// Empty snapshot for a freshly started session.
    #[must_use]
    pub fn started(session: SessionInfo) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    /// Return the snapshot that results from applying `event`.
    #[must_use]
    pub fn apply(mut self, event: &RuntimeEvent) -> Self {
        self.apply_in_place(event);
        self
    }

    /// Apply `event` to this snapshot. Returns whether anything changed.
    ///
    /// `RuntimeError`, `MeetingStart` and `MeetingEnd` never change the
    /// snapshot; they are handled by the session flow.
    pub fn apply_in_place(&mut self, event: &RuntimeEvent) -> bool {
        match event {
            RuntimeEvent::AttendeeJoin {
                attendee_id,
                external_user_id,
            } => self.attendee_join(attendee_id, external_user_id),
            RuntimeEvent::AttendeeLeave { attendee_id } => self.roster.remove(attendee_id),
            RuntimeEvent::AttendeeMute { attendee_id } => self.muted.insert(attendee_id.clone()),
            RuntimeEvent::AttendeeUnmute { attendee_id } => self.muted.remove(attendee_id),
            RuntimeEvent::VideoTileAdd(tile) => self.video_tile_add(tile),
            RuntimeEvent::VideoTileRemove(tile) => self.video_tile_remove(tile),
            RuntimeEvent::RuntimeError { .. }
            | RuntimeEvent::MeetingStart
            | RuntimeEvent::MeetingEnd => false,
        }
    }

    fn attendee_join(&mut self, id: &AttendeeId, external_user_id: &ExternalUserId) -> bool {
        let mut changed = false;

        if !self.names.contains_key(id) {
            let name = external_user_id.display_name();
            // Empty labels are left out so the id fallback applies.
            if !name.is_empty() {
                self.names.insert(id.clone(), name.to_string());
                changed = true;
            }
        }

        self.roster.insert(id.clone()) || changed
    }

    fn video_tile_add(&mut self, tile: &VideoTile) -> bool {
        if tile.is_screen_share {
            let previous = self.screen_share.replace(tile.tile_id);
            return previous != Some(tile.tile_id);
        }

        let mut changed = self.video_tiles.insert(tile.tile_id);
        if tile.is_local && !self.self_video {
            self.self_video = true;
            changed = true;
        }
        changed
    }

    fn video_tile_remove(&mut self, tile: &VideoTile) -> bool {
        if tile.is_screen_share {
            if self.screen_share == Some(tile.tile_id) {
                self.screen_share = None;
                return true;
            }
            return false;
        }

        let mut changed = self.video_tiles.remove(&tile.tile_id);
        if tile.is_local && self.self_video {
            self.self_video = false;
            changed = true;
        }
        changed
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    /// Generation of the active session, if any.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.generation)
    }

    /// Local participant's attendee id, if a session is active.
    #[must_use]
    pub fn self_attendee_id(&self) -> Option<&AttendeeId> {
        self.session.as_ref().map(|s| &s.self_attendee_id)
    }

    /// Meeting title, if a session is active.
    #[must_use]
    pub fn meeting_title(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.meeting_title.as_str())
    }

    /// Attendees currently joined.
    #[must_use]
    pub fn roster(&self) -> &BTreeSet<AttendeeId> {
        &self.roster
    }

    /// Attendees currently muted (may include attendees not in the roster).
    #[must_use]
    pub fn muted(&self) -> &BTreeSet<AttendeeId> {
        &self.muted
    }

    #[must_use]
    pub fn is_muted(&self, id: &AttendeeId) -> bool {
        self.muted.contains(id)
    }

    /// Whether the local participant is muted. False outside a session.
    #[must_use]
    pub fn is_self_muted(&self) -> bool {
        self.self_attendee_id()
            .is_some_and(|id| self.muted.contains(id))
    }

    /// Display name for `id`, falling back to the raw id.
    #[must_use]
    pub fn display_name_for<'a>(&'a self, id: &'a AttendeeId) -> &'a str {
        self.names
            .get(id)
            .map_or_else(|| id.as_str(), String::as_str)
    }

    /// Visible non-screen-share video tiles.
    #[must_use]
    pub fn video_tiles(&self) -> &BTreeSet<TileId> {
        &self.video_tiles
    }

    /// The screen-share tile, if one is showing.
    #[must_use]
    pub fn screen_share(&self) -> Option<TileId> {
        self.screen_share
    }

    /// Whether the local camera tile is showing.
    #[must_use]
    pub fn has_self_video(&self) -> bool {
        self.self_video
    }

    /// Roster as rows ready for an attendee list, ordered by id.
    #[must_use]
    pub fn attendees(&self) -> Vec<AttendeeRow> {
        self.roster
            .iter()
            .map(|id| AttendeeRow {
                id: id.clone(),
                name: self.display_name_for(id).to_string(),
                muted: self.muted.contains(id),
            })
            .collect()
    }
}
