//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The join token
//! handed out with meeting credentials authorizes media access for one
//! attendee, so it is held as a [`SecretString`] from the moment it is
//! deserialized until it is handed to the runtime.
//!
//! # Compile-Time Safety
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that contains one is safe to log via `{:?}` or `tracing`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Attendee {
//!     attendee_id: String,
//!     join_token: SecretString,
//! }
//!
//! let attendee = Attendee {
//!     attendee_id: "a1".to_string(),
//!     join_token: SecretString::from("token-value"),
//! };
//!
//! assert!(!format!("{attendee:?}").contains("token-value"));
//! assert_eq!(attendee.join_token.expose_secret(), "token-value");
//! ```
//!
//! # Serde Integration
//!
//! With the `serde` feature enabled, secrets deserialize from JSON strings.
//! Serializing is opt-in per field through [`serialize_exposed`], which is
//! only used where the value must cross into the media runtime.

pub use secrecy::{ExposeSecret, SecretString};

use serde::Serializer;

/// Serialize a secret string in clear text.
///
/// Use with `#[serde(serialize_with = "common::secret::serialize_exposed")]`
/// on fields that must be forwarded to a trusted peer.
///
/// # Errors
///
/// Propagates the serializer's error.
pub fn serialize_exposed<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}
