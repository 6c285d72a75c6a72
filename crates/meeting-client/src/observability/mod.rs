//! Observability for the meeting client.
//!
//! # Privacy by Default
//!
//! Instrumented functions use `#[instrument(skip_all)]` with explicit fields.
//! Join tokens are never logged; user names appear only at debug level.
//!
//! # Log Targets
//!
//! | Target | Component |
//! |--------|-----------|
//! | `mc_client.store` | Snapshot reducer and store |
//! | `mc_client.session` | Subscription lifecycle |
//! | `mc_client.join` | Join orchestration |
//! | `mc_client.channel` | Event channel and pump |
//! | `mc_client.commands` | Runtime command sink |
//! | `mc_client.alerts` | Alerts shown to the user |
//! | `mc_client.credentials` | Join credential HTTP client |
//! | `mc_client.bridge` | Stdio runtime bridge |
//!
//! # Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `mc_client_events_applied_total` | Counter | `kind` |
//! | `mc_client_events_ignored_total` | Counter | `reason` |
//! | `mc_client_join_attempts_total` | Counter | `outcome` |
//! | `mc_client_runtime_errors_total` | Counter | `kind` |
//! | `mc_client_roster_size` | Gauge | none |

pub mod metrics;

pub use metrics::{
    record_event_applied, record_event_ignored, record_join_attempt, record_runtime_error,
    set_roster_size,
};

use common::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_filter` when set. Logs go to stderr so
/// that stdout stays free for the runtime command stream.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.as_str().into());

    let (json_layer, text_layer) = if config.json_logs {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
}
