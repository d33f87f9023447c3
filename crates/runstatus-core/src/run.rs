//! TaskRun: one execution of a task, with the spec fields the lifecycle
//! logic reads and the status it maintains.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ids::{RunKey, Uid};
use crate::status::{RunStatus, StatusFields};
use crate::timeout::TimeoutPolicy;

/// API version of TaskRun objects.
pub const API_VERSION: &str = "tekton.dev/v1beta1";
/// Kind of TaskRun objects.
pub const TASK_RUN_KIND: &str = "TaskRun";
/// Kind of the parent orchestration unit.
pub const PIPELINE_RUN_KIND: &str = "PipelineRun";
/// Label naming the pipeline a run belongs to.
pub const PIPELINE_LABEL: &str = "tekton.dev/pipeline";
/// Label naming the pipeline run a run belongs to.
pub const PIPELINE_RUN_LABEL: &str = "tekton.dev/pipelineRun";

/// Back-reference to an owning object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

impl OwnerReference {
    /// Create a plain (non-controller) owner reference.
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            uid: Uid::default(),
            controller: None,
            block_owner_deletion: None,
        }
    }
}

/// Reference to another object by kind and namespaced name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Object metadata consumed by the lifecycle logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

/// User-requested state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecStatus {
    /// Stop the run if it is not already finished.
    #[serde(rename = "TaskRunCancelled")]
    Cancelled,
}

/// Template for a per-run persistent volume claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaimTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage: String,
}

/// Binds a task workspace to a volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_claim_template: Option<VolumeClaimTemplate>,
}

/// Desired state of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunSpec {
    #[serde(default)]
    pub service_account_name: String,

    /// Explicit timeout in milliseconds. `0` disables the timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_millis: Option<u64>,

    /// Set to request cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpecStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspaceBinding>,
}

impl TaskRunSpec {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_millis.map(Duration::from_millis)
    }

    /// Store `timeout`, rounding up to whole milliseconds so a non-zero
    /// timeout never collapses into the `0` sentinel.
    pub fn set_timeout(&mut self, timeout: Duration) {
        let mut millis = timeout.as_millis();
        if timeout.subsec_nanos() % 1_000_000 != 0 {
            millis += 1;
        }
        self.timeout_millis = Some(u64::try_from(millis).unwrap_or(u64::MAX));
    }
}

/// Pipeline a run belongs to, read from its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineMembership {
    pub pipeline: String,
    /// Empty if the pipeline run label is missing.
    pub pipeline_run: String,
}

/// One execution of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TaskRunSpec,
    #[serde(default)]
    pub status: RunStatus,
}

impl TaskRun {
    /// Create a new TaskRun with a fresh uid.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                uid: Uid::generate(),
                ..ObjectMeta::default()
            },
            spec: TaskRunSpec::default(),
            status: RunStatus::default(),
        }
    }

    /// Builder method to set an explicit timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.spec.set_timeout(timeout);
        self
    }

    /// Builder method to add an owner reference.
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.metadata.owner_references.push(owner);
        self
    }

    /// Builder method to add a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    /// Builder method to add a workspace binding.
    pub fn with_workspace(mut self, workspace: WorkspaceBinding) -> Self {
        self.spec.workspaces.push(workspace);
        self
    }

    /// Stable key for this run, from its namespaced name.
    pub fn run_key(&self) -> RunKey {
        RunKey::new(TASK_RUN_KIND, &self.metadata.namespace, &self.metadata.name)
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }

    pub fn has_started(&self) -> bool {
        self.status.has_started()
    }

    /// True if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.spec.status == Some(SpecStatus::Cancelled)
    }

    /// Request cancellation. Cannot be undone.
    ///
    /// Returns true if this call made the request.
    pub fn request_cancellation(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.spec.status = Some(SpecStatus::Cancelled);
        info!(run = %self.run_key(), "Cancellation requested");
        true
    }

    /// Timeout that applies to this run.
    pub fn get_timeout(&self, policy: &TimeoutPolicy) -> Duration {
        policy.effective_timeout(self.spec.timeout())
    }

    /// Instant after which this run counts as timed out, if any.
    pub fn deadline(&self, policy: &TimeoutPolicy) -> Option<DateTime<Utc>> {
        policy.deadline(self.status.start_time, self.spec.timeout())
    }

    /// True if the run has been going for longer than its timeout.
    pub fn has_timed_out(&self, policy: &TimeoutPolicy, clock: &impl Clock) -> bool {
        policy.has_timed_out(self.status.start_time, self.spec.timeout(), clock.utc())
    }

    /// Fail an unfinished run that has timed out and stamp its completion.
    ///
    /// Returns true if the run was failed by this call.
    pub fn check_timeout(&mut self, policy: &TimeoutPolicy, clock: &impl Clock) -> bool {
        if self.is_done() || !self.has_timed_out(policy, clock) {
            return false;
        }
        let timeout = self.get_timeout(policy);
        warn!(run = %self.run_key(), timeout = ?timeout, "Run timed out");
        self.status.mark_timed_out(timeout, clock);
        self.status.record_completion(clock);
        true
    }

    /// Fail an unfinished run whose cancellation was requested and stamp
    /// its completion.
    ///
    /// Returns true if the run was failed by this call.
    pub fn check_cancellation(&mut self, clock: &impl Clock) -> bool {
        if self.is_done() || !self.is_cancelled() {
            return false;
        }
        let message = format!("TaskRun {:?} was cancelled", self.metadata.name);
        info!(run = %self.run_key(), "Run cancelled");
        self.status.mark_cancelled(message, clock);
        self.status.record_completion(clock);
        true
    }

    fn pipeline_run_owner(&self) -> Option<&OwnerReference> {
        self.metadata
            .owner_references
            .iter()
            .find(|r| r.kind == PIPELINE_RUN_KIND)
    }

    /// True if a PipelineRun owns this run.
    pub fn has_pipeline_run_owner_reference(&self) -> bool {
        self.pipeline_run_owner().is_some()
    }

    /// Name of the PVC shared through the owning PipelineRun.
    pub fn pipeline_run_pvc_name(&self) -> Option<String> {
        self.pipeline_run_owner().map(|r| format!("{}-pvc", r.name))
    }

    /// Pipeline and pipeline run this run is part of, from its labels.
    pub fn pipeline_membership(&self) -> Option<PipelineMembership> {
        let labels = &self.metadata.labels;
        let pipeline = labels.get(PIPELINE_LABEL)?;
        Some(PipelineMembership {
            pipeline: pipeline.clone(),
            pipeline_run: labels.get(PIPELINE_RUN_LABEL).cloned().unwrap_or_default(),
        })
    }

    /// True if any workspace asks for a per-run volume claim.
    pub fn has_volume_claim_template(&self) -> bool {
        self.spec
            .workspaces
            .iter()
            .any(|w| w.volume_claim_template.is_some())
    }

    /// Reference to the pod that executes this run.
    pub fn build_pod_ref(&self) -> ObjectReference {
        ObjectReference {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }

    /// Controller owner reference for objects created on behalf of this run.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: API_VERSION.to_string(),
            kind: TASK_RUN_KIND.to_string(),
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }
}
