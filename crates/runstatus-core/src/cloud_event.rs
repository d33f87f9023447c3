//! Cloud event delivery tracking.
//!
//! Dispatching and backoff happen elsewhere; this module only records the
//! outcome of each attempt per target. `retry_count` only grows, `sent_at`
//! is stamped when the event is sent, and `Sent` is final.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Delivery condition of a cloud event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudEventCondition {
    /// No attempt has finished yet.
    #[default]
    Unknown,
    /// The event was delivered.
    Sent,
    /// One or more attempts were made and none succeeded so far.
    Failed,
}

impl std::fmt::Display for CloudEventCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Sent => "Sent",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Outcome of one delivery attempt, reported by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

/// State of delivery to one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudEventDeliveryState {
    #[serde(default)]
    pub condition: CloudEventCondition,

    /// When the event was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,

    /// Error from the last failed attempt.
    #[serde(default, rename = "message")]
    pub error: String,

    /// Number of delivery attempts.
    #[serde(default)]
    pub retry_count: u32,
}

/// A cloud event target and the state of delivery to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEventDelivery {
    pub target: String,
    #[serde(default)]
    pub status: CloudEventDeliveryState,
}

impl CloudEventDelivery {
    /// Create a record with no attempts yet.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            status: CloudEventDeliveryState::default(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status.condition == CloudEventCondition::Sent
    }

    /// Record one delivery attempt.
    ///
    /// Attempts after a successful send are rejected and leave the record
    /// untouched.
    pub fn record_attempt(
        &mut self,
        outcome: DeliveryOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.is_sent() {
            return Err(CoreError::DeliveryAlreadySent {
                target: self.target.clone(),
            });
        }

        self.status.retry_count = self.status.retry_count.saturating_add(1);
        match outcome {
            DeliveryOutcome::Sent => {
                self.status.condition = CloudEventCondition::Sent;
                self.status.sent_at = Some(now);
                self.status.error.clear();
            }
            DeliveryOutcome::Failed(error) => {
                self.status.condition = CloudEventCondition::Failed;
                self.status.error = error;
            }
        }
        Ok(())
    }
}
