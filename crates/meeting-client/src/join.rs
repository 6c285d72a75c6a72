//! Join orchestrator.
//!
//! One attempt per user action, never retried:
//!
//! 1. Validate (trimmed) meeting and user names
//! 2. Take a new generation from the session controller
//! 3. Request join credentials (the only suspending step)
//! 4. Activate the session for the returned self attendee id
//! 5. Send the `join` command with the returned descriptors
//!
//! Any failure leaves the controller Idle and reports one alert. An attempt
//! overtaken by a teardown or a newer attempt ends silently.

use crate::alerts::AlertSink;
use crate::commands::CommandSink;
use crate::errors::ClientError;
use crate::observability::metrics::record_join_attempt;
use crate::services::join_client::JoinCredentialsProvider;
use crate::session::SessionController;
use common::types::AttendeeId;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A successfully started session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedSession {
    pub generation: u64,
    pub self_attendee_id: AttendeeId,
    pub meeting_title: String,
}

/// Trim and check the join form.
///
/// # Errors
///
/// Returns `ClientError::InvalidInput` if either name is empty after trimming.
pub fn validate_join_input<'a>(
    meeting_name: &'a str,
    user_name: &'a str,
) -> Result<(&'a str, &'a str), ClientError> {
    let meeting_name = meeting_name.trim();
    let user_name = user_name.trim();

    if meeting_name.is_empty() {
        return Err(ClientError::InvalidInput("meeting name is empty".to_string()));
    }
    if user_name.is_empty() {
        return Err(ClientError::InvalidInput("user name is empty".to_string()));
    }
    Ok((meeting_name, user_name))
}

/// Runs join attempts against the credential service and the runtime.
pub struct JoinOrchestrator {
    credentials: Arc<dyn JoinCredentialsProvider>,
    sessions: Arc<SessionController>,
    commands: Arc<dyn CommandSink>,
    alerts: Arc<dyn AlertSink>,
}

impl JoinOrchestrator {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn JoinCredentialsProvider>,
        sessions: Arc<SessionController>,
        commands: Arc<dyn CommandSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            credentials,
            sessions,
            commands,
            alerts,
        }
    }

    /// Run one join attempt.
    ///
    /// The returned error has already been reported to the alert sink.
    ///
    /// # Errors
    ///
    /// Returns the `ClientError` that ended the attempt.
    #[instrument(skip_all)]
    pub async fn join(
        &self,
        meeting_name: &str,
        user_name: &str,
    ) -> Result<JoinedSession, ClientError> {
        let result = self.attempt(meeting_name, user_name).await;

        match &result {
            Ok(session) => {
                info!(
                    target: "mc_client.join",
                    generation = session.generation,
                    self_attendee_id = %session.self_attendee_id,
                    "Joined meeting"
                );
                record_join_attempt("success");
            }
            Err(e) => {
                record_join_attempt(e.label());
                if let Some(alert) = e.alert() {
                    warn!(target: "mc_client.join", error = %e, "Join attempt failed");
                    self.alerts.report(alert);
                } else {
                    info!(target: "mc_client.join", error = %e, "Join attempt abandoned");
                }
            }
        }

        result
    }

    async fn attempt(
        &self,
        meeting_name: &str,
        user_name: &str,
    ) -> Result<JoinedSession, ClientError> {
        let (meeting_name, user_name) = validate_join_input(meeting_name, user_name)?;
        let generation = self.sessions.begin_attempt()?;

        let credentials = match self.credentials.request_join(meeting_name, user_name).await {
            Ok(credentials) => credentials,
            // Nobody is waiting for this attempt any more
            Err(_) if !self.sessions.is_current(generation) => {
                return Err(ClientError::Superseded)
            }
            Err(e) => return Err(e.into()),
        };

        let self_attendee_id = credentials.self_attendee_id().clone();
        self.sessions
            .activate(generation, self_attendee_id.clone(), meeting_name)?;

        // A teardown may land between activation and the join command
        let sent = self.sessions.with_active_session(generation, || {
            self.commands
                .join(&credentials.meeting, &credentials.attendee);
        });
        if !sent {
            return Err(ClientError::Superseded);
        }

        Ok(JoinedSession {
            generation,
            self_attendee_id,
            meeting_title: meeting_name.to_string(),
        })
    }
}
