//! User-facing alerts.
//!
//! The presentation layer implements [`AlertSink`] to show `(title, message)`
//! pairs. Runtime errors are classified here: the concurrent-video limit gets
//! its own wording, everything else is shown with the runtime's raw
//! description.

use crate::events::MeetingError;
use tracing::warn;

/// Title of the alert shown when a join attempt fails.
pub const JOIN_FAILED_TITLE: &str = "Unable to find meeting";

/// Message of the alert shown when a join attempt fails (cause appended).
pub const JOIN_FAILED_MESSAGE: &str = "There was an issue finding that meeting. The meeting may have already ended, or your authorization may have expired.";

/// Title of the alert shown when the join form is incomplete.
pub const MISSING_JOIN_FIELDS_TITLE: &str = "Meeting name and user name can not be empty";

/// Title of the alert shown when the video limit is hit.
pub const VIDEO_LIMIT_TITLE: &str = "Failed to enable video";

/// Message of the alert shown when the video limit is hit.
pub const VIDEO_LIMIT_MESSAGE: &str = "maximum number of concurrent videos reached!";

/// Title for unclassified runtime errors during a meeting.
pub const RUNTIME_ERROR_TITLE: &str = "Error";

/// Title for runtime errors raised while no meeting session is active.
pub const SDK_ERROR_TITLE: &str = "SDK Error";

/// A user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    /// Create an alert.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Alert for a failed join attempt, including the underlying cause.
    #[must_use]
    pub fn join_failed(cause: &str) -> Self {
        Self::new(JOIN_FAILED_TITLE, format!("{JOIN_FAILED_MESSAGE}\n {cause}"))
    }

    /// Alert for an incomplete join form.
    #[must_use]
    pub fn missing_join_fields() -> Self {
        Self::new(MISSING_JOIN_FIELDS_TITLE, "")
    }

    /// Alert for a runtime error raised during a meeting session.
    #[must_use]
    pub fn for_runtime_error(error: &MeetingError) -> Self {
        match error {
            MeetingError::MaximumConcurrentVideoReached => {
                Self::new(VIDEO_LIMIT_TITLE, VIDEO_LIMIT_MESSAGE)
            }
            MeetingError::Other(raw) => Self::new(RUNTIME_ERROR_TITLE, raw.clone()),
        }
    }

    /// Alert for a runtime error raised outside a meeting session.
    #[must_use]
    pub fn sdk_error(error: &MeetingError) -> Self {
        Self::new(SDK_ERROR_TITLE, error.to_string())
    }
}

/// Receives alerts for display.
pub trait AlertSink: Send + Sync {
    /// Show an alert to the user.
    fn report(&self, alert: Alert);
}

/// Alert sink that only logs. Used by the stdio bridge, where there is no
/// screen to show alerts on.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn report(&self, alert: Alert) {
        warn!(
            target: "mc_client.alerts",
            title = %alert.title,
            message = %alert.message,
            "User alert"
        );
    }
}
