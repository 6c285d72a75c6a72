//! Meeting client error types.
//!
//! Every error that reaches the user maps to an [`Alert`] via
//! [`ClientError::alert`]. Internal details are logged, not shown, except for
//! join failures where the underlying cause helps the user decide whether to
//! retry.

use crate::alerts::Alert;
use thiserror::Error;

/// Errors from the event channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The runtime's notification source has shut down.
    #[error("Event channel closed")]
    Closed,
}

/// Errors from the join credential collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    /// The meeting does not exist (or has already ended).
    #[error("Meeting not found")]
    NotFound,

    /// The service refused the request (bad input or expired authorization).
    #[error("Join request rejected: {0}")]
    Rejected(String),

    /// The service could not be reached or failed internally.
    #[error("Meeting service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a body we could not understand.
    #[error("Invalid join response: {0}")]
    InvalidResponse(String),

    /// The HTTP client could not be built.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CredentialsError {
    /// Bounded label used in metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CredentialsError::NotFound => "not_found",
            CredentialsError::Rejected(_) => "rejected",
            CredentialsError::Unavailable(_) => "unavailable",
            CredentialsError::InvalidResponse(_) => "invalid_response",
            CredentialsError::Configuration(_) => "configuration",
        }
    }
}

/// Meeting client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Meeting name or user name missing.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credential request failed.
    #[error("Join credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// A session subscription could not be acquired.
    #[error("Subscription failed: {0}")]
    Subscription(#[from] ChannelError),

    /// A session is already active; hang up first.
    #[error("A meeting session is already active")]
    AlreadyActive,

    /// The attempt was overtaken by a teardown or a newer attempt.
    #[error("Join attempt superseded")]
    Superseded,
}

impl ClientError {
    /// Returns the user-facing alert for this error.
    ///
    /// `Superseded` has no alert: the user already moved on.
    #[must_use]
    pub fn alert(&self) -> Option<Alert> {
        match self {
            ClientError::InvalidInput(_) => Some(Alert::missing_join_fields()),
            ClientError::Credentials(e) => Some(Alert::join_failed(&e.to_string())),
            ClientError::Subscription(_) | ClientError::AlreadyActive => {
                Some(Alert::join_failed("Unable to start the meeting session"))
            }
            ClientError::Superseded => None,
        }
    }

    /// Bounded label used in metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ClientError::InvalidInput(_) => "invalid_input",
            ClientError::Credentials(e) => e.label(),
            ClientError::Subscription(_) => "subscription_failed",
            ClientError::AlreadyActive => "already_active",
            ClientError::Superseded => "superseded",
        }
    }
}
