//! Test helpers.

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// A clock `secs` seconds after a fixed base instant.
    pub(crate) fn at(secs: i64) -> Self {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Self(base + TimeDelta::seconds(secs))
    }

    pub(crate) fn minutes(minutes: i64) -> Self {
        Self::at(minutes * 60)
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}
