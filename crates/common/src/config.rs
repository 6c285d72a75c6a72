//! Common configuration types for the meeting client crates.

use serde::{Deserialize, Serialize};

/// Default log filter when `RUST_LOG` is not set.
///
/// Events use explicit `mc_client.*` targets; spans from `#[instrument]`
/// use the module path.
pub const DEFAULT_LOG_FILTER: &str = "mc_client=debug,meeting_client=debug";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Fallback `tracing` filter directive (used when `RUST_LOG` is unset)
    pub log_filter: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}
