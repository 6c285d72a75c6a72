//! Metrics definitions for the meeting client.
//!
//! All metrics follow Prometheus naming conventions:
//! - `mc_client_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `kind`: 9 event kinds, or the bounded runtime error labels
//! - `reason`: 2 values (stale_generation, no_session)
//! - `outcome`: bounded by `ClientError::label` plus `success`
//!
//! No recorder is installed here; the embedding application decides where
//! metrics go. Without a recorder every call is a no-op.

use metrics::{counter, gauge};

/// Record an event applied to the meeting snapshot
///
/// Metric: `mc_client_events_applied_total`
/// Labels: `kind`
pub fn record_event_applied(kind: &'static str) {
    counter!("mc_client_events_applied_total", "kind" => kind).increment(1);
}

/// Record an event that reached the store but was not applied
///
/// Metric: `mc_client_events_ignored_total`
/// Labels: `reason`
///
/// `stale_generation` means the event was tagged with a session that has
/// since ended; `no_session` means no session was active at all.
pub fn record_event_ignored(reason: &'static str) {
    counter!("mc_client_events_ignored_total", "reason" => reason).increment(1);
}

/// Record the outcome of a join attempt
///
/// Metric: `mc_client_join_attempts_total`
/// Labels: `outcome`
pub fn record_join_attempt(outcome: &'static str) {
    counter!("mc_client_join_attempts_total", "outcome" => outcome).increment(1);
}

/// Record a runtime error surfaced to the user
///
/// Metric: `mc_client_runtime_errors_total`
/// Labels: `kind`
pub fn record_runtime_error(kind: &'static str) {
    counter!("mc_client_runtime_errors_total", "kind" => kind).increment(1);
}

/// Set the current roster size
///
/// Metric: `mc_client_roster_size`
#[allow(clippy::cast_precision_loss)]
pub fn set_roster_size(size: usize) {
    gauge!("mc_client_roster_size").set(size as f64);
}
