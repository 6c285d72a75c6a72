//! Runtime event types.
//!
//! Events arrive from the conferencing runtime in no particular order across
//! kinds and without sequence numbers. The wire form is a JSON object tagged
//! by `"event"`, e.g.
//! `{"event":"attendee_join","attendee_id":"a1","external_user_id":"p#Alice"}`.

use common::types::{AttendeeId, ExternalUserId, TileId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named event kinds a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    AttendeeJoin,
    AttendeeLeave,
    AttendeeMute,
    AttendeeUnmute,
    VideoTileAdd,
    VideoTileRemove,
    RuntimeError,
    MeetingStart,
    MeetingEnd,
}

impl EventKind {
    /// The kinds a meeting session subscribes to while active.
    pub const SESSION: [EventKind; 7] = [
        EventKind::AttendeeJoin,
        EventKind::AttendeeLeave,
        EventKind::AttendeeMute,
        EventKind::AttendeeUnmute,
        EventKind::VideoTileAdd,
        EventKind::VideoTileRemove,
        EventKind::RuntimeError,
    ];

    /// Bounded label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AttendeeJoin => "attendee_join",
            EventKind::AttendeeLeave => "attendee_leave",
            EventKind::AttendeeMute => "attendee_mute",
            EventKind::AttendeeUnmute => "attendee_unmute",
            EventKind::VideoTileAdd => "video_tile_add",
            EventKind::VideoTileRemove => "video_tile_remove",
            EventKind::RuntimeError => "runtime_error",
            EventKind::MeetingStart => "meeting_start",
            EventKind::MeetingEnd => "meeting_end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one video tile as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTile {
    /// Runtime-assigned tile handle.
    pub tile_id: TileId,
    /// Whether the tile shows the local camera.
    #[serde(default)]
    pub is_local: bool,
    /// Whether the tile carries a screen share.
    #[serde(default)]
    pub is_screen_share: bool,
}

impl VideoTile {
    /// A remote camera tile.
    #[must_use]
    pub fn remote(tile_id: u64) -> Self {
        Self {
            tile_id: TileId(tile_id),
            is_local: false,
            is_screen_share: false,
        }
    }

    /// The local camera tile.
    #[must_use]
    pub fn local(tile_id: u64) -> Self {
        Self {
            tile_id: TileId(tile_id),
            is_local: true,
            is_screen_share: false,
        }
    }

    /// A screen-share tile.
    #[must_use]
    pub fn screen_share(tile_id: u64) -> Self {
        Self {
            tile_id: TileId(tile_id),
            is_local: false,
            is_screen_share: true,
        }
    }
}

/// Operational error kinds reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeetingError {
    /// The meeting already shows the maximum number of concurrent videos.
    MaximumConcurrentVideoReached,
    /// Any other error, carrying the runtime's raw description.
    Other(String),
}

impl MeetingError {
    const MAXIMUM_CONCURRENT_VIDEO_REACHED: &'static str = "maximum_concurrent_video_reached";

    /// Bounded label used in metrics (`other` for unclassified errors).
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            MeetingError::MaximumConcurrentVideoReached => Self::MAXIMUM_CONCURRENT_VIDEO_REACHED,
            MeetingError::Other(_) => "other",
        }
    }
}

impl From<String> for MeetingError {
    fn from(raw: String) -> Self {
        // Native SDKs name this one `OnMaximumConcurrentVideoReached`
        match raw.as_str() {
            Self::MAXIMUM_CONCURRENT_VIDEO_REACHED | "OnMaximumConcurrentVideoReached" => {
                MeetingError::MaximumConcurrentVideoReached
            }
            _ => MeetingError::Other(raw),
        }
    }
}

impl From<&str> for MeetingError {
    fn from(raw: &str) -> Self {
        MeetingError::from(raw.to_string())
    }
}

impl From<MeetingError> for String {
    fn from(error: MeetingError) -> Self {
        match error {
            MeetingError::MaximumConcurrentVideoReached => {
                MeetingError::MAXIMUM_CONCURRENT_VIDEO_REACHED.to_string()
            }
            MeetingError::Other(raw) => raw,
        }
    }
}

impl fmt::Display for MeetingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingError::MaximumConcurrentVideoReached => {
                f.write_str(Self::MAXIMUM_CONCURRENT_VIDEO_REACHED)
            }
            MeetingError::Other(raw) => f.write_str(raw),
        }
    }
}

/// An event delivered by the conferencing runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// An attendee joined (or the runtime redelivered the join).
    AttendeeJoin {
        attendee_id: AttendeeId,
        external_user_id: ExternalUserId,
    },

    /// An attendee left.
    AttendeeLeave { attendee_id: AttendeeId },

    /// An attendee muted their microphone.
    AttendeeMute { attendee_id: AttendeeId },

    /// An attendee unmuted their microphone.
    AttendeeUnmute { attendee_id: AttendeeId },

    /// A video tile became visible.
    VideoTileAdd(VideoTile),

    /// A video tile went away.
    VideoTileRemove(VideoTile),

    /// The runtime reported an operational error.
    RuntimeError { kind: MeetingError },

    /// The runtime finished connecting to the meeting.
    MeetingStart,

    /// The meeting ended for this client (hang-up acknowledged or remote end).
    MeetingEnd,
}

impl RuntimeEvent {
    /// The kind handlers subscribe to for this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            RuntimeEvent::AttendeeJoin { .. } => EventKind::AttendeeJoin,
            RuntimeEvent::AttendeeLeave { .. } => EventKind::AttendeeLeave,
            RuntimeEvent::AttendeeMute { .. } => EventKind::AttendeeMute,
            RuntimeEvent::AttendeeUnmute { .. } => EventKind::AttendeeUnmute,
            RuntimeEvent::VideoTileAdd(_) => EventKind::VideoTileAdd,
            RuntimeEvent::VideoTileRemove(_) => EventKind::VideoTileRemove,
            RuntimeEvent::RuntimeError { .. } => EventKind::RuntimeError,
            RuntimeEvent::MeetingStart => EventKind::MeetingStart,
            RuntimeEvent::MeetingEnd => EventKind::MeetingEnd,
        }
    }

    /// Shorthand for an attendee join event.
    #[must_use]
    pub fn attendee_join(attendee_id: &str, external_user_id: &str) -> Self {
        RuntimeEvent::AttendeeJoin {
            attendee_id: AttendeeId::new(attendee_id),
            external_user_id: ExternalUserId::new(external_user_id),
        }
    }

    /// Shorthand for an attendee leave event.
    #[must_use]
    pub fn attendee_leave(attendee_id: &str) -> Self {
        RuntimeEvent::AttendeeLeave {
            attendee_id: AttendeeId::new(attendee_id),
        }
    }

    /// Shorthand for an attendee mute event.
    #[must_use]
    pub fn attendee_mute(attendee_id: &str) -> Self {
        RuntimeEvent::AttendeeMute {
            attendee_id: AttendeeId::new(attendee_id),
        }
    }

    /// Shorthand for an attendee unmute event.
    #[must_use]
    pub fn attendee_unmute(attendee_id: &str) -> Self {
        RuntimeEvent::AttendeeUnmute {
            attendee_id: AttendeeId::new(attendee_id),
        }
    }

    /// Shorthand for a runtime error event.
    #[must_use]
    pub fn runtime_error(kind: impl Into<MeetingError>) -> Self {
        RuntimeEvent::RuntimeError { kind: kind.into() }
    }
}
