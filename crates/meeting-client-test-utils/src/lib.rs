//! # Meeting Client Test Utilities
//!
//! Mocks and fixtures for testing the meeting client without a real
//! conferencing runtime or meeting service.
//!
//! ## Modules
//!
//! - `mock_credentials` - Scripted join credential provider, optionally gated
//! - `mock_runtime` - Recording command sink and alert sink
//! - `mock_source` - Event source that counts cancellations and can fail
//! - `fixtures` - Join credentials, join response bodies, event helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_client_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let source = CountingEventSource::new();
//!     let credentials = MockCredentials::succeeding(join_credentials("a1"));
//!     let commands = RecordingCommandSink::new();
//!     let alerts = RecordingAlertSink::new();
//!
//!     let client = MeetingClient::new(
//!         source.clone(), credentials, commands.clone(), alerts.clone(),
//!     ).unwrap();
//!     client.join("room1", "Alice").await.unwrap();
//!
//!     source.deliver(&attendee_join("a1", "Alice"));
//!     assert_eq!(client.snapshot().roster().len(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mock_credentials;
pub mod mock_runtime;
pub mod mock_source;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_credentials::*;
pub use mock_runtime::*;
pub use mock_source::*;
