//! Recording stand-ins for the conferencing runtime and the alert surface.

use meeting_client::alerts::{Alert, AlertSink};
use meeting_client::commands::CommandSink;
use meeting_client::services::{AttendeeDescriptor, MeetingDescriptor};
use std::sync::{Arc, Mutex};

/// A command as seen by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    Join {
        meeting_id: String,
        attendee_id: String,
    },
    Leave,
    SetMuted(bool),
    SetCameraEnabled(bool),
}

/// Command sink that records every command in order.
#[derive(Debug, Default)]
pub struct RecordingCommandSink {
    commands: Mutex<Vec<RecordedCommand>>,
}

impl RecordingCommandSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Commands received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: RecordedCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

impl CommandSink for RecordingCommandSink {
    fn join(&self, meeting: &MeetingDescriptor, attendee: &AttendeeDescriptor) {
        self.record(RecordedCommand::Join {
            meeting_id: meeting.meeting_id.clone(),
            attendee_id: attendee.attendee_id.to_string(),
        });
    }

    fn leave(&self) {
        self.record(RecordedCommand::Leave);
    }

    fn set_muted(&self, muted: bool) {
        self.record(RecordedCommand::SetMuted(muted));
    }

    fn set_camera_enabled(&self, enabled: bool) {
        self.record(RecordedCommand::SetCameraEnabled(enabled));
    }
}

/// Alert sink that records every alert.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Alerts reported so far.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    /// Titles of the alerts reported so far.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.alerts().into_iter().map(|a| a.title).collect()
    }
}

impl AlertSink for RecordingAlertSink {
    fn report(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }
}
