//! Runtime command sink.
//!
//! Commands are fire-and-forget: nothing here reports success, and nothing
//! here touches the meeting snapshot. The effect of a command becomes
//! visible only when the runtime emits the matching event (e.g. `set_muted`
//! is followed by an `attendee_mute` event for the local attendee).

use crate::services::join_client::{AttendeeDescriptor, MeetingDescriptor};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Commands understood by the conferencing runtime.
///
/// Wire form is a JSON object tagged by `"command"`, e.g.
/// `{"command":"set_muted","muted":true}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RuntimeCommand {
    /// Connect to the meeting with the credentials from the join response.
    Join {
        meeting: MeetingDescriptor,
        attendee: AttendeeDescriptor,
    },

    /// Leave the meeting (hang up).
    Leave,

    /// Mute or unmute the local microphone.
    SetMuted { muted: bool },

    /// Turn the local camera on or off.
    SetCameraEnabled { enabled: bool },
}

impl RuntimeCommand {
    /// Bounded label used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeCommand::Join { .. } => "join",
            RuntimeCommand::Leave => "leave",
            RuntimeCommand::SetMuted { .. } => "set_muted",
            RuntimeCommand::SetCameraEnabled { .. } => "set_camera_enabled",
        }
    }
}

/// Sink for commands to the conferencing runtime.
pub trait CommandSink: Send + Sync {
    /// Join the meeting described by `meeting` as `attendee`.
    fn join(&self, meeting: &MeetingDescriptor, attendee: &AttendeeDescriptor);

    /// Leave the current meeting.
    fn leave(&self);

    /// Mute (`true`) or unmute (`false`) the local microphone.
    fn set_muted(&self, muted: bool);

    /// Enable (`true`) or disable (`false`) the local camera.
    fn set_camera_enabled(&self, enabled: bool);
}

/// Command sink that forwards commands over a channel to the runtime bridge.
#[derive(Debug, Clone)]
pub struct ChannelCommandSink {
    sender: mpsc::UnboundedSender<RuntimeCommand>,
}

impl ChannelCommandSink {
    /// Create a sink and the receiver the runtime bridge reads from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RuntimeCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, command: RuntimeCommand) {
        let name = command.name();
        if self.sender.send(command).is_err() {
            // Runtime gone: there is nobody to tell, and the resulting
            // event will simply never arrive.
            warn!(
                target: "mc_client.commands",
                command = name,
                "Runtime command channel closed, command dropped"
            );
        } else {
            debug!(target: "mc_client.commands", command = name, "Command sent");
        }
    }
}

impl CommandSink for ChannelCommandSink {
    fn join(&self, meeting: &MeetingDescriptor, attendee: &AttendeeDescriptor) {
        self.send(RuntimeCommand::Join {
            meeting: meeting.clone(),
            attendee: attendee.clone(),
        });
    }

    fn leave(&self) {
        self.send(RuntimeCommand::Leave);
    }

    fn set_muted(&self, muted: bool) {
        self.send(RuntimeCommand::SetMuted { muted });
    }

    fn set_camera_enabled(&self, enabled: bool) {
        self.send(RuntimeCommand::SetCameraEnabled { enabled });
    }
}
