//! Timeout policy for runs.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::RunConfig;

/// Decides how long a run may take and whether it has run out of time.
///
/// Stateless: the answer only depends on the start time, the timeout and
/// the `now` passed in, so repeated checks can flip from "not timed out"
/// to "timed out" as time passes but never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    default_timeout: Duration,
    no_timeout: Duration,
}

impl TimeoutPolicy {
    pub fn new(default_timeout: Duration, no_timeout: Duration) -> Self {
        Self {
            default_timeout,
            no_timeout,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.default_timeout(), config.no_timeout())
    }

    /// The explicit timeout if one is set, else the platform default.
    ///
    /// An explicit value equal to the no-timeout sentinel is returned as is;
    /// it does not fall through to the default.
    pub fn effective_timeout(&self, explicit: Option<Duration>) -> Duration {
        explicit.unwrap_or(self.default_timeout)
    }

    /// Returns true if the timeout means "never time out".
    pub fn is_unlimited(&self, timeout: Duration) -> bool {
        timeout == self.no_timeout
    }

    /// Instant after which the run counts as timed out.
    ///
    /// `None` when the run has not started, the timeout is unlimited, or
    /// the deadline is beyond what can be represented.
    pub fn deadline(
        &self,
        start_time: Option<DateTime<Utc>>,
        explicit: Option<Duration>,
    ) -> Option<DateTime<Utc>> {
        let start = start_time.filter(|t| !is_zero_time(t))?;
        let timeout = self.effective_timeout(explicit);
        if self.is_unlimited(timeout) {
            return None;
        }
        let timeout = TimeDelta::from_std(timeout).ok()?;
        start.checked_add_signed(timeout)
    }

    /// Returns true iff `now - start_time > timeout`.
    pub fn has_timed_out(
        &self,
        start_time: Option<DateTime<Utc>>,
        explicit: Option<Duration>,
        now: DateTime<Utc>,
    ) -> bool {
        self.deadline(start_time, explicit)
            .is_some_and(|deadline| now > deadline)
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

/// Timestamps at or before the Unix epoch count as "never set".
pub(crate) fn is_zero_time(t: &DateTime<Utc>) -> bool {
    t.timestamp() <= 0
}
