//! Per-container state of a run's steps and sidecars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution state of one container, as last polled from the pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerState {
    #[default]
    Waiting,
    #[serde(rename_all = "camelCase")]
    Running {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    Terminated {
        exit_code: i32,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finished_at: Option<DateTime<Utc>>,
    },
}

impl ContainerState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }

    /// Exit code, if the container has terminated.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Terminated { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// State of one step container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub name: String,
    #[serde(default, rename = "container")]
    pub container_name: String,
    #[serde(default, rename = "imageID")]
    pub image_id: String,
    #[serde(default)]
    pub state: ContainerState,
}

impl StepState {
    /// Create an empty step state, before any poll.
    pub fn new(name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_name: container_name.into(),
            ..Self::default()
        }
    }
}

/// State of one sidecar container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarState {
    pub name: String,
    #[serde(default, rename = "container")]
    pub container_name: String,
    #[serde(default, rename = "imageID")]
    pub image_id: String,
    #[serde(default)]
    pub state: ContainerState,
}

impl SidecarState {
    pub fn new(name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_name: container_name.into(),
            ..Self::default()
        }
    }
}
