//! Mock join credential provider.
//!
//! Answers every request with a scripted result and records what was asked.
//! A gated mock holds each request until [`CredentialsGate::release`] is
//! called, which lets tests tear a session down while a join is in flight.
//!
//! # Example
//!
//! ```rust,ignore
//! use meeting_client_test_utils::{join_credentials, MockCredentials};
//!
//! let (credentials, gate) = MockCredentials::succeeding(join_credentials("a1")).gated();
//! // start the join, tear down, then:
//! gate.release();
//! ```

use async_trait::async_trait;
use meeting_client::errors::CredentialsError;
use meeting_client::services::{JoinCredentials, JoinCredentialsProvider};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A recorded credential request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub meeting_name: String,
    pub user_name: String,
}

/// Handle that releases requests held by a gated [`MockCredentials`].
#[derive(Debug, Clone)]
pub struct CredentialsGate {
    notify: Arc<Notify>,
}

impl CredentialsGate {
    /// Let one held (or the next) request complete.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// Scripted [`JoinCredentialsProvider`].
#[derive(Debug)]
pub struct MockCredentials {
    result: Result<JoinCredentials, CredentialsError>,
    requests: Mutex<Vec<CredentialRequest>>,
    gate: Option<Arc<Notify>>,
    started: Arc<Notify>,
}

impl MockCredentials {
    /// Mock that always returns `credentials`.
    #[must_use]
    pub fn succeeding(credentials: JoinCredentials) -> Arc<Self> {
        Arc::new(Self::with_result(Ok(credentials)))
    }

    /// Mock that always fails with `error`.
    #[must_use]
    pub fn failing(error: CredentialsError) -> Arc<Self> {
        Arc::new(Self::with_result(Err(error)))
    }

    fn with_result(result: Result<JoinCredentials, CredentialsError>) -> Self {
        Self {
            result,
            requests: Mutex::new(Vec::new()),
            gate: None,
            started: Arc::new(Notify::new()),
        }
    }

    /// Hold every request until the returned gate is released.
    ///
    /// # Panics
    ///
    /// Panics if the mock has already been shared.
    #[must_use]
    pub fn gated(self: Arc<Self>) -> (Arc<Self>, CredentialsGate) {
        let mut mock = Arc::try_unwrap(self).expect("gated() must be called before sharing the mock");
        let notify = Arc::new(Notify::new());
        mock.gate = Some(Arc::clone(&notify));
        (Arc::new(mock), CredentialsGate { notify })
    }

    /// Wait until a request has reached the mock.
    pub async fn wait_for_request(&self) {
        if !self.requests().is_empty() {
            return;
        }
        self.started.notified().await;
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CredentialRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl JoinCredentialsProvider for MockCredentials {
    async fn request_join(
        &self,
        meeting_name: &str,
        user_name: &str,
    ) -> Result<JoinCredentials, CredentialsError> {
        self.requests.lock().unwrap().push(CredentialRequest {
            meeting_name: meeting_name.to_string(),
            user_name: user_name.to_string(),
        });
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.result.clone()
    }
}
