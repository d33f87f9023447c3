//! Platform-wide run configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default run timeout when a run does not set one.
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 60;

/// Timeout value that disables the timeout entirely.
pub const NO_TIMEOUT_SECS: u64 = 0;

/// Number of retry snapshots kept per run.
pub const DEFAULT_RETRY_HISTORY_LIMIT: usize = 10;

/// Configuration injected by the hosting orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    /// Timeout applied to runs without an explicit one (minutes).
    pub default_timeout_minutes: u64,

    /// Sentinel timeout meaning "never time out" (seconds).
    pub no_timeout_secs: u64,

    /// Maximum retry snapshots retained; the oldest are dropped first.
    pub retry_history_limit: usize,
}

impl RunConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_minutes.saturating_mul(60))
    }

    pub fn no_timeout(&self) -> Duration {
        Duration::from_secs(self.no_timeout_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            no_timeout_secs: NO_TIMEOUT_SECS,
            retry_history_limit: DEFAULT_RETRY_HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.default_timeout(), Duration::from_secs(3600));
        assert_eq!(config.no_timeout(), Duration::ZERO);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"defaultTimeoutMinutes": 5}"#).unwrap();
        assert_eq!(config.default_timeout(), Duration::from_secs(300));
        assert_eq!(config.retry_history_limit, DEFAULT_RETRY_HISTORY_LIMIT);
    }
}
