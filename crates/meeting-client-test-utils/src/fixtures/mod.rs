//! Pre-configured test data fixtures.
//!
//! Provides:
//! - Join credentials as returned by the credential provider
//! - Join response bodies as served by the meeting service
//! - Runtime event shorthands

use common::secret::SecretString;
use common::types::{AttendeeId, ExternalUserId};
use meeting_client::events::{RuntimeEvent, VideoTile};
use meeting_client::services::{AttendeeDescriptor, JoinCredentials, MeetingDescriptor};

/// Join token used by every fixture.
pub const TEST_JOIN_TOKEN: &str = "test-join-token";

/// Prefix used when composing external user ids in fixtures.
pub const TEST_USER_PREFIX: &str = "0f3c9a1e";

/// Default meeting id for fixtures.
pub const TEST_MEETING_ID: &str = "meeting-123";

/// Join credentials for a session whose local attendee is `self_attendee_id`.
#[must_use]
pub fn join_credentials(self_attendee_id: &str) -> JoinCredentials {
    TestJoin::new(self_attendee_id).credentials()
}

/// Builder for join credentials and the matching service response.
#[derive(Debug, Clone)]
pub struct TestJoin {
    /// Service-assigned meeting id.
    pub meeting_id: String,
    /// Meeting name echoed back by the service.
    pub meeting_title: String,
    /// Local attendee id.
    pub attendee_id: String,
    /// Local user name.
    pub user_name: String,
    /// Media region.
    pub region: String,
}

impl TestJoin {
    /// Create a join fixture for `attendee_id` with default values.
    #[must_use]
    pub fn new(attendee_id: impl Into<String>) -> Self {
        Self {
            meeting_id: TEST_MEETING_ID.to_string(),
            meeting_title: "room1".to_string(),
            attendee_id: attendee_id.into(),
            user_name: "Alice".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    /// Set the meeting name.
    #[must_use]
    pub fn with_meeting_title(mut self, title: impl Into<String>) -> Self {
        self.meeting_title = title.into();
        self
    }

    /// Set the user name.
    #[must_use]
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    /// External user id the service would assign.
    #[must_use]
    pub fn external_user_id(&self) -> String {
        ExternalUserId::compose(TEST_USER_PREFIX, &self.user_name)
            .as_str()
            .to_string()
    }

    /// Typed credentials.
    #[must_use]
    pub fn credentials(&self) -> JoinCredentials {
        let mut meeting_extra = serde_json::Map::new();
        meeting_extra.insert(
            "MediaPlacement".to_string(),
            serde_json::json!({"AudioHostUrl": "audio.test.local"}),
        );

        JoinCredentials {
            meeting: MeetingDescriptor {
                meeting_id: self.meeting_id.clone(),
                external_meeting_id: Some(self.meeting_title.clone()),
                media_region: Some(self.region.clone()),
                extra: meeting_extra,
            },
            attendee: AttendeeDescriptor {
                attendee_id: AttendeeId::new(self.attendee_id.clone()),
                external_user_id: ExternalUserId::compose(TEST_USER_PREFIX, &self.user_name),
                join_token: SecretString::from(TEST_JOIN_TOKEN),
                extra: serde_json::Map::new(),
            },
        }
    }

    /// Response body as served by `POST /join`.
    #[must_use]
    pub fn response_body(&self) -> serde_json::Value {
        serde_json::json!({
            "JoinInfo": {
                "Meeting": {
                    "Meeting": {
                        "MeetingId": self.meeting_id,
                        "ExternalMeetingId": self.meeting_title,
                        "MediaRegion": self.region,
                        "MediaPlacement": {"AudioHostUrl": "audio.test.local"}
                    }
                },
                "Attendee": {
                    "Attendee": {
                        "AttendeeId": self.attendee_id,
                        "ExternalUserId": self.external_user_id(),
                        "JoinToken": TEST_JOIN_TOKEN
                    }
                }
            }
        })
    }
}

/// `attendee_join` event with a fixture-style external user id.
#[must_use]
pub fn attendee_join(attendee_id: &str, display_name: &str) -> RuntimeEvent {
    RuntimeEvent::attendee_join(
        attendee_id,
        ExternalUserId::compose(TEST_USER_PREFIX, display_name).as_str(),
    )
}

/// `attendee_leave` event.
#[must_use]
pub fn attendee_leave(attendee_id: &str) -> RuntimeEvent {
    RuntimeEvent::attendee_leave(attendee_id)
}

/// `attendee_mute` event.
#[must_use]
pub fn attendee_mute(attendee_id: &str) -> RuntimeEvent {
    RuntimeEvent::attendee_mute(attendee_id)
}

/// `attendee_unmute` event.
#[must_use]
pub fn attendee_unmute(attendee_id: &str) -> RuntimeEvent {
    RuntimeEvent::attendee_unmute(attendee_id)
}

/// `video_tile_add` for a remote camera.
#[must_use]
pub fn remote_tile_add(tile_id: u64) -> RuntimeEvent {
    RuntimeEvent::VideoTileAdd(VideoTile::remote(tile_id))
}

/// `video_tile_add` for the local camera.
#[must_use]
pub fn local_tile_add(tile_id: u64) -> RuntimeEvent {
    RuntimeEvent::VideoTileAdd(VideoTile::local(tile_id))
}

/// `video_tile_remove` for the local camera.
#[must_use]
pub fn local_tile_remove(tile_id: u64) -> RuntimeEvent {
    RuntimeEvent::VideoTileRemove(VideoTile::local(tile_id))
}

/// `video_tile_add` for a screen share.
#[must_use]
pub fn screen_share_add(tile_id: u64) -> RuntimeEvent {
    RuntimeEvent::VideoTileAdd(VideoTile::screen_share(tile_id))
}

/// `video_tile_remove` for a screen share.
#[must_use]
pub fn screen_share_remove(tile_id: u64) -> RuntimeEvent {
    RuntimeEvent::VideoTileRemove(VideoTile::screen_share(tile_id))
}

/// `runtime_error` event with the raw error string.
#[must_use]
pub fn runtime_error(kind: &str) -> RuntimeEvent {
    RuntimeEvent::runtime_error(kind)
}
