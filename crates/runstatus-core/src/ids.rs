//! Newtype wrappers for identifiers to ensure type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable lookup key for a run, derived from its namespaced name.
///
/// Format: `<Kind>/<namespace>/<name>`. Survives restarts and
/// serialization, unlike keys derived from in-memory addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey(String);

impl RunKey {
    /// Build a key from a kind and a namespaced name.
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self(format!("{kind}/{namespace}/{name}"))
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier assigned to an object when it is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Create a new Uid from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random Uid.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no uid has been assigned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_generate() {
        let id1 = Uid::generate();
        let id2 = Uid::generate();
        assert_ne!(id1, id2);
        assert!(!id1.is_empty());
    }

    #[test]
    fn test_run_key_display() {
        let key = RunKey::new("TaskRun", "default", "build-1");
        assert_eq!(format!("{}", key), "TaskRun/default/build-1");
    }

    #[test]
    fn test_run_key_is_stable() {
        let a = RunKey::new("TaskRun", "ci", "lint");
        let b = RunKey::new("TaskRun", "ci", "lint");
        assert_eq!(a, b);
        assert_ne!(a, RunKey::new("TaskRun", "prod", "lint"));
    }
}
