//! Identifier types assigned by the conferencing runtime.
//!
//! All identifiers are opaque: the client never invents them, it only
//! stores and compares what the runtime hands out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the opaque prefix and the display name of an
/// [`ExternalUserId`].
pub const EXTERNAL_USER_ID_SEPARATOR: char = '#';

/// Stable identifier for a meeting attendee, unique per meeting session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendeeId(String);

impl AttendeeId {
    /// Wrap a runtime-assigned attendee id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttendeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttendeeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AttendeeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle for one renderable video stream (camera or screen share).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime-supplied user label of the form `<opaque-prefix>#<displayName>`.
///
/// The prefix carries provenance (e.g. a random join nonce), the suffix the
/// name the user typed when joining.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalUserId(String);

impl ExternalUserId {
    /// Wrap a runtime-supplied external user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an external user id from a prefix and a display name.
    #[must_use]
    pub fn compose(prefix: &str, display_name: &str) -> Self {
        Self(format!(
            "{prefix}{EXTERNAL_USER_ID_SEPARATOR}{display_name}"
        ))
    }

    /// Borrow the raw value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name encoded in this id.
    ///
    /// Everything after the first `#`. Ids without a separator are treated
    /// as a bare display name, so parsing never fails.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.0.split_once(EXTERNAL_USER_ID_SEPARATOR) {
            Some((_, name)) => name,
            None => &self.0,
        }
    }
}

impl fmt::Display for ExternalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExternalUserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
