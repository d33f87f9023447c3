//! Conditions: named tri-state flags reported in a run's status.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of a condition within a condition set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionType(Cow<'static, str>);

impl ConditionType {
    /// Aggregate condition summarizing the health of the whole run.
    pub const SUCCEEDED: Self = Self(Cow::Borrowed("Succeeded"));

    /// Whether the resource can be converted to a newer API version.
    pub const CONVERTIBLE: Self = Self(Cow::Borrowed("Convertible"));

    /// Create a condition type from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the condition type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for an empty (unusable) type name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Tri-state value of a condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// True and False are terminal; Unknown is not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// How much weight a non-True condition carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionSeverity {
    /// Serialized as the empty string, the persisted default.
    #[default]
    #[serde(rename = "")]
    Error,
    Warning,
    Info,
}

impl ConditionSeverity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// A single observation about a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type; unique within a status.
    pub r#type: ConditionType,

    /// Current value.
    pub status: ConditionStatus,

    #[serde(default, skip_serializing_if = "ConditionSeverity::is_error")]
    pub severity: ConditionSeverity,

    /// Last time the status value changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// One-word CamelCase reason for the last transition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human-readable details.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Condition {
    /// Create a condition with no reason or message.
    pub fn new(r#type: ConditionType, status: ConditionStatus) -> Self {
        Self {
            r#type,
            status,
            severity: ConditionSeverity::Error,
            last_transition_time: None,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn unknown(r#type: ConditionType) -> Self {
        Self::new(r#type, ConditionStatus::Unknown)
    }

    /// Builder method to set reason and message.
    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = reason.into();
        self.message = message.into();
        self
    }

    /// Builder method to set severity.
    pub fn with_severity(mut self, severity: ConditionSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_json_shape() {
        let cond = Condition::new(ConditionType::SUCCEEDED, ConditionStatus::False)
            .with_reason("BuildFailed", "exit 1");
        let json = serde_json::to_value(&cond).unwrap();

        assert_eq!(json["type"], "Succeeded");
        assert_eq!(json["status"], "False");
        assert_eq!(json["reason"], "BuildFailed");
        assert!(json.get("severity").is_none());
        assert!(json.get("lastTransitionTime").is_none());
    }

    #[test]
    fn test_condition_parses_warning_severity() {
        let json = r#"{"type":"Convertible","status":"False","severity":"Warning","reason":"spec.foo"}"#;
        let cond: Condition = serde_json::from_str(json).unwrap();

        assert_eq!(cond.r#type, ConditionType::CONVERTIBLE);
        assert_eq!(cond.severity, ConditionSeverity::Warning);
        assert!(cond.is_false());
        assert!(cond.message.is_empty());
    }

    #[test]
    fn test_status_terminal() {
        assert!(ConditionStatus::True.is_terminal());
        assert!(ConditionStatus::False.is_terminal());
        assert!(!ConditionStatus::Unknown.is_terminal());
    }
}
