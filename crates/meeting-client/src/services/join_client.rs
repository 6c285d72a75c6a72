//! Join credential client.
//!
//! Asks the meeting service for the credentials needed to join a meeting:
//! a meeting descriptor and an attendee descriptor, both of which are handed
//! to the runtime untouched with the `join` command.
//!
//! # Wire format
//!
//! `POST {api_url}/join?title=<meeting>&name=<user>&region=<region>` returns
//!
//! ```json
//! {"JoinInfo": {
//!   "Meeting":  {"Meeting":  {"MeetingId": "...", "MediaRegion": "...", "MediaPlacement": {}}},
//!   "Attendee": {"Attendee": {"AttendeeId": "...", "ExternalUserId": "...", "JoinToken": "..."}}}}
//! ```
//!
//! Fields we do not model are kept in `extra` and forwarded as-is.
//!
//! # Security
//!
//! - The join token is a [`SecretString`] and never appears in logs
//! - Timeouts come from the transport; there is no retry (a failed join is
//!   surfaced once and the user decides whether to try again)

use crate::config::Config;
use crate::errors::CredentialsError;
use async_trait::async_trait;
use common::secret::SecretString;
use common::types::{AttendeeId, ExternalUserId};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Default connection timeout for the HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Meeting descriptor from the join response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeetingDescriptor {
    /// Service-assigned meeting id.
    pub meeting_id: String,

    /// Caller-chosen meeting name, if echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_meeting_id: Option<String>,

    /// Media region the meeting is hosted in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_region: Option<String>,

    /// Everything else (media placement URLs etc.), passed through.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Attendee descriptor from the join response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttendeeDescriptor {
    /// Id the runtime will use for this client in attendee events.
    pub attendee_id: AttendeeId,

    /// `<prefix>#<user name>` label.
    pub external_user_id: ExternalUserId,

    /// Media authorization for this attendee.
    #[serde(serialize_with = "common::secret::serialize_exposed")]
    pub join_token: SecretString,

    /// Everything else, passed through.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Successful join credential response.
#[derive(Debug, Clone)]
pub struct JoinCredentials {
    pub meeting: MeetingDescriptor,
    pub attendee: AttendeeDescriptor,
}

impl JoinCredentials {
    /// The attendee id this client will appear as.
    #[must_use]
    pub fn self_attendee_id(&self) -> &AttendeeId {
        &self.attendee.attendee_id
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JoinResponseBody {
    join_info: JoinInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JoinInfo {
    meeting: MeetingEnvelope,
    attendee: AttendeeEnvelope,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MeetingEnvelope {
    meeting: MeetingDescriptor,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttendeeEnvelope {
    attendee: AttendeeDescriptor,
}

impl From<JoinResponseBody> for JoinCredentials {
    fn from(body: JoinResponseBody) -> Self {
        Self {
            meeting: body.join_info.meeting.meeting,
            attendee: body.join_info.attendee.attendee,
        }
    }
}

/// Source of join credentials.
#[async_trait]
pub trait JoinCredentialsProvider: Send + Sync {
    /// Request credentials to join `meeting_name` as `user_name`.
    ///
    /// # Errors
    ///
    /// Returns a `CredentialsError` describing why no credentials were issued.
    async fn request_join(
        &self,
        meeting_name: &str,
        user_name: &str,
    ) -> Result<JoinCredentials, CredentialsError>;
}

/// HTTP client for the meeting service join endpoint.
#[derive(Clone)]
pub struct HttpJoinClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL of the meeting service.
    base_url: String,

    /// Media region requested for new meetings.
    region: String,
}

impl HttpJoinClient {
    /// Create a new join client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the meeting service (e.g. "https://meet.example.com/v1")
    /// * `region` - Media region requested for new meetings
    /// * `timeout` - Total request timeout
    ///
    /// # Errors
    ///
    /// Returns `CredentialsError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: String, region: String, timeout: Duration) -> Result<Self, CredentialsError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                error!(target: "mc_client.credentials", error = %e, "Failed to build HTTP client");
                CredentialsError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            region,
        })
    }

    /// Create a join client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsError::Configuration` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, CredentialsError> {
        Self::new(
            config.api_url.clone(),
            config.region.clone(),
            config.http_timeout,
        )
    }

    /// Map the service response to credentials or an error.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<JoinCredentials, CredentialsError> {
        let status = response.status();

        if status.is_success() {
            let body: JoinResponseBody = response.json().await.map_err(|e| {
                warn!(target: "mc_client.credentials", error = %e, "Failed to parse join response");
                CredentialsError::InvalidResponse(e.to_string())
            })?;
            Ok(body.into())
        } else if status == StatusCode::NOT_FOUND {
            Err(CredentialsError::NotFound)
        } else if status.is_server_error() {
            warn!(target: "mc_client.credentials", status = %status, "Meeting service returned server error");
            Err(CredentialsError::Unavailable(format!("Status {status}")))
        } else if status.is_client_error() {
            warn!(target: "mc_client.credentials", status = %status, "Join request rejected");
            Err(CredentialsError::Rejected(format!("Status {status}")))
        } else {
            warn!(target: "mc_client.credentials", status = %status, "Unexpected meeting service response");
            Err(CredentialsError::InvalidResponse(format!(
                "Unexpected status: {status}"
            )))
        }
    }
}

#[async_trait]
impl JoinCredentialsProvider for HttpJoinClient {
    #[instrument(skip_all, fields(meeting = %meeting_name))]
    async fn request_join(
        &self,
        meeting_name: &str,
        user_name: &str,
    ) -> Result<JoinCredentials, CredentialsError> {
        let url = format!("{}/join", self.base_url);

        debug!(target: "mc_client.credentials", url = %url, "Requesting join credentials");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("title", meeting_name),
                ("name", user_name),
                ("region", self.region.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(target: "mc_client.credentials", error = %e, "Join request failed");
                CredentialsError::Unavailable(e.to_string())
            })?;

        self.handle_response(response).await
    }
}
