//! Observed status of a run: conditions, timing, and the side records
//! (steps, sidecars, cloud events, results, retry history).
//!
//! Every operation is a plain mutation of a status value the caller owns.
//! Serializing concurrent writers to the same run is the caller's job.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cloud_event::{CloudEventDelivery, DeliveryOutcome};
use crate::condition::{Condition, ConditionSeverity, ConditionStatus, ConditionType};
use crate::condition_set::{ConditionManager, ConditionSet};
use crate::container::{SidecarState, StepState};
use crate::error::{CannotConvertError, CoreError};
use crate::timeout::is_zero_time;

/// Conditions tracked by a TaskRun: `Succeeded` only, written directly.
static TASK_RUN_CONDITIONS: ConditionSet = ConditionSet::batch();

/// Reason used while a run is executing.
pub const REASON_RUNNING: &str = "Running";
/// Reason used when a run finished successfully.
pub const REASON_SUCCEEDED: &str = "Succeeded";
/// Reason used when a run was cancelled on request.
pub const REASON_CANCELLED: &str = "TaskRunCancelled";
/// Reason used when a run exceeded its timeout.
pub const REASON_TIMEOUT: &str = "TaskRunTimeout";

/// Read access to the fields shared by live statuses and retry snapshots.
pub trait StatusFields {
    fn conditions(&self) -> &[Condition];

    fn start_time(&self) -> Option<DateTime<Utc>>;

    fn completion_time(&self) -> Option<DateTime<Utc>>;

    fn pod_name(&self) -> &str;

    /// Get a condition by type, if present.
    fn get_condition(&self, t: &ConditionType) -> Option<&Condition> {
        self.conditions().iter().find(|c| &c.r#type == t)
    }

    fn has_condition(&self, t: &ConditionType) -> bool {
        self.get_condition(t).is_some()
    }

    /// The aggregate `Succeeded` condition.
    fn succeeded(&self) -> Option<&Condition> {
        self.get_condition(&ConditionType::SUCCEEDED)
    }

    /// True once `Succeeded` is True or False.
    fn is_done(&self) -> bool {
        self.succeeded().is_some_and(|c| !c.is_unknown())
    }

    fn is_successful(&self) -> bool {
        self.succeeded().is_some_and(Condition::is_true)
    }

    /// True if a non-zero start time is recorded.
    fn has_started(&self) -> bool {
        self.start_time().is_some_and(|t| !is_zero_time(&t))
    }

    /// Time from start to completion, or to `now` while still running.
    fn duration(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        let start = self.start_time().filter(|t| !is_zero_time(t))?;
        let end = self.completion_time().unwrap_or(now);
        Some(end - start)
    }
}

/// A result written out by the run's containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRunResult {
    pub name: String,
    pub value: String,
}

/// A result produced by a pipeline resource, e.g. an image digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResourceResult {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_ref: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result_type: String,
}

/// Observed state of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Name of the pod executing the run's steps.
    #[serde(default)]
    pub pod_name: String,

    /// Set once, on first initialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Set once the `Succeeded` condition is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepState>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sidecars: Vec<SidecarState>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cloud_events: Vec<CloudEventDelivery>,

    /// Snapshots of earlier attempts, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retries_status: Vec<RetrySnapshot>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources_result: Vec<PipelineResourceResult>,

    #[serde(default, rename = "taskResults", skip_serializing_if = "Vec::is_empty")]
    pub task_results: Vec<TaskRunResult>,
}

impl StatusFields for RunStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completion_time
    }

    fn pod_name(&self) -> &str {
        &self.pod_name
    }
}

impl RunStatus {
    /// The condition set governing run statuses.
    pub fn condition_set() -> &'static ConditionSet {
        &TASK_RUN_CONDITIONS
    }

    fn manage(&mut self, now: DateTime<Utc>) -> ConditionManager<'_> {
        TASK_RUN_CONDITIONS.manage(&mut self.conditions, now)
    }

    /// Set missing conditions to Unknown and stamp the start time if unset.
    ///
    /// Idempotent; never regresses a True/False condition.
    pub fn initialize_conditions(&mut self, clock: &impl Clock) {
        let now = clock.utc();
        if !self.has_started() {
            self.start_time = Some(now);
            debug!(start_time = %now, "Run started");
        }
        self.manage(now).initialize();
    }

    /// Set a condition, replacing any condition of the same type.
    ///
    /// `None` is accepted and ignored. Returns true if anything changed.
    pub fn set_condition(
        &mut self,
        condition: impl Into<Option<Condition>>,
        clock: &impl Clock,
    ) -> bool {
        match condition.into() {
            Some(condition) => self.manage(clock.utc()).set(condition),
            None => {
                debug!("Ignoring empty condition");
                false
            }
        }
    }

    /// Mark the run as still executing. Ignored once the run is done.
    pub fn mark_running(
        &mut self,
        reason: impl Into<String>,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> bool {
        self.set_condition(
            Condition::unknown(ConditionType::SUCCEEDED).with_reason(reason, message),
            clock,
        )
    }

    /// Mark the run as successful.
    pub fn mark_succeeded(
        &mut self,
        reason: impl Into<String>,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> bool {
        self.set_condition(
            Condition::new(ConditionType::SUCCEEDED, ConditionStatus::True)
                .with_reason(reason, message),
            clock,
        )
    }

    /// Mark the run as failed.
    ///
    /// Does not set the completion time; see [`RunStatus::record_completion`].
    pub fn mark_failed(
        &mut self,
        reason: impl Into<String>,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> bool {
        self.set_condition(
            Condition::new(ConditionType::SUCCEEDED, ConditionStatus::False)
                .with_reason(reason, message),
            clock,
        )
    }

    /// Fail the run because it was cancelled.
    pub fn mark_cancelled(&mut self, message: impl Into<String>, clock: &impl Clock) -> bool {
        self.mark_failed(REASON_CANCELLED, message, clock)
    }

    /// Fail the run because it ran past `timeout`.
    pub fn mark_timed_out(&mut self, timeout: Duration, clock: &impl Clock) -> bool {
        let message = format!("TaskRun failed to finish within {:?}", timeout);
        self.mark_failed(REASON_TIMEOUT, message, clock)
    }

    /// Record a Warning-severity `Convertible=False` condition.
    ///
    /// Convertible is not part of the aggregate, so `Succeeded` is untouched.
    pub fn mark_not_convertible(&mut self, err: &CannotConvertError, clock: &impl Clock) -> bool {
        self.set_condition(
            Condition::new(ConditionType::CONVERTIBLE, ConditionStatus::False)
                .with_severity(ConditionSeverity::Warning)
                .with_reason(err.field.clone(), err.message.clone()),
            clock,
        )
    }

    /// Stamp the completion time if the run is done and it is not yet set.
    ///
    /// Returns true if the completion time was set by this call.
    pub fn record_completion(&mut self, clock: &impl Clock) -> bool {
        if !self.is_done() || self.completion_time.is_some() {
            return false;
        }
        let now = clock.utc();
        self.completion_time = Some(now);
        debug!(completion_time = %now, "Run completed");
        true
    }

    /// Insert or replace the state of the step with the same name.
    ///
    /// Ignored once the run is done.
    pub fn upsert_step(&mut self, step: StepState) -> bool {
        if self.is_done() {
            debug!(step = %step.name, "Ignoring step update on finished run");
            return false;
        }
        upsert_by_name(&mut self.steps, step, |s| s.name.as_str());
        true
    }

    /// Insert or replace the state of the sidecar with the same name.
    ///
    /// Ignored once the run is done.
    pub fn upsert_sidecar(&mut self, sidecar: SidecarState) -> bool {
        if self.is_done() {
            debug!(sidecar = %sidecar.name, "Ignoring sidecar update on finished run");
            return false;
        }
        upsert_by_name(&mut self.sidecars, sidecar, |s| s.name.as_str());
        true
    }

    /// Set a task result, replacing an earlier result with the same name.
    pub fn set_result(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let result = TaskRunResult {
            name: name.into(),
            value: value.into(),
        };
        upsert_by_name(&mut self.task_results, result, |r| r.name.as_str());
    }

    /// Get a task result by name.
    pub fn result(&self, name: &str) -> Option<&str> {
        self.task_results
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value.as_str())
    }

    /// Record a pipeline resource result, replacing one with the same key.
    pub fn set_resource_result(&mut self, result: PipelineResourceResult) {
        upsert_by_name(&mut self.resources_result, result, |r| r.key.as_str());
    }

    /// Get a pipeline resource result by key.
    pub fn resource_result(&self, key: &str) -> Option<&PipelineResourceResult> {
        self.resources_result.iter().find(|r| r.key == key)
    }

    /// Delivery record for a cloud event target.
    pub fn cloud_event(&self, target: &str) -> Option<&CloudEventDelivery> {
        self.cloud_events.iter().find(|e| e.target == target)
    }

    /// Record a delivery attempt for `target`, creating its record on the
    /// first attempt.
    pub fn record_cloud_event(
        &mut self,
        target: &str,
        outcome: DeliveryOutcome,
        clock: &impl Clock,
    ) -> Result<&CloudEventDelivery, CoreError> {
        let index = match self.cloud_events.iter().position(|e| e.target == target) {
            Some(i) => i,
            None => {
                self.cloud_events.push(CloudEventDelivery::new(target));
                self.cloud_events.len() - 1
            }
        };

        let delivery = &mut self.cloud_events[index];
        delivery.record_attempt(outcome, clock.utc())?;
        debug!(
            target = %delivery.target,
            condition = %delivery.status.condition,
            retry_count = delivery.status.retry_count,
            "Recorded cloud event attempt"
        );
        Ok(&*delivery)
    }

    /// Move the finished attempt into the retry history and reset the
    /// per-attempt fields for a new attempt.
    ///
    /// Keeps at most `limit` snapshots, dropping the oldest. The start time
    /// and cloud event records carry over. Ignored while the run is not done.
    pub fn record_retry(&mut self, limit: usize, clock: &impl Clock) -> bool {
        if !self.is_done() {
            debug!("Ignoring retry of unfinished run");
            return false;
        }

        let snapshot = RetrySnapshot::capture(self);
        self.retries_status.push(snapshot);
        if self.retries_status.len() > limit {
            let excess = self.retries_status.len() - limit;
            self.retries_status.drain(..excess);
        }

        self.conditions.clear();
        self.pod_name.clear();
        self.completion_time = None;
        self.steps.clear();
        self.sidecars.clear();
        self.task_results.clear();
        self.resources_result.clear();
        self.initialize_conditions(clock);
        true
    }

    /// Number of retained retry snapshots.
    pub fn retry_count(&self) -> usize {
        self.retries_status.len()
    }
}

fn upsert_by_name<T>(items: &mut Vec<T>, item: T, name: impl Fn(&T) -> &str) {
    match items.iter().position(|existing| name(existing) == name(&item)) {
        Some(i) => items[i] = item,
        None => items.push(item),
    }
}

/// Immutable record of a finished attempt.
///
/// Has no retry history of its own, so history cannot nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySnapshot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<Condition>,
    #[serde(default)]
    pod_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    steps: Vec<StepState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sidecars: Vec<SidecarState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cloud_events: Vec<CloudEventDelivery>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    resources_result: Vec<PipelineResourceResult>,
    #[serde(default, rename = "taskResults", skip_serializing_if = "Vec::is_empty")]
    task_results: Vec<TaskRunResult>,
}

impl RetrySnapshot {
    /// Copy everything but the retry history out of a status.
    pub fn capture(status: &RunStatus) -> Self {
        Self {
            conditions: status.conditions.clone(),
            pod_name: status.pod_name.clone(),
            start_time: status.start_time,
            completion_time: status.completion_time,
            steps: status.steps.clone(),
            sidecars: status.sidecars.clone(),
            cloud_events: status.cloud_events.clone(),
            resources_result: status.resources_result.clone(),
            task_results: status.task_results.clone(),
        }
    }

    pub fn steps(&self) -> &[StepState] {
        &self.steps
    }

    pub fn sidecars(&self) -> &[SidecarState] {
        &self.sidecars
    }

    pub fn cloud_events(&self) -> &[CloudEventDelivery] {
        &self.cloud_events
    }

    pub fn task_results(&self) -> &[TaskRunResult] {
        &self.task_results
    }

    pub fn resources_result(&self) -> &[PipelineResourceResult] {
        &self.resources_result
    }
}

impl StatusFields for RetrySnapshot {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completion_time
    }

    fn pod_name(&self) -> &str {
        &self.pod_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud_event::CloudEventCondition;
    use crate::container::ContainerState;
    use crate::testing::FixedClock;

    #[test]
    fn test_initialize_sets_start_time_once() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);
        let first = status.clone();

        status.initialize_conditions(&FixedClock::at(30));

        assert_eq!(status, first);
        assert_eq!(status.start_time, Some(clock.utc()));
        assert!(status.succeeded().unwrap().is_unknown());
        assert!(status.has_started());
        assert!(!status.is_done());
    }

    #[test]
    fn test_initialize_does_not_regress_terminal_condition() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);
        status.mark_succeeded(REASON_SUCCEEDED, "all steps completed", &clock);

        status.initialize_conditions(&clock);

        assert!(status.is_successful());
    }

    #[test]
    fn test_mark_failed_scenario() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);

        status.mark_failed("BuildFailed", "step 2 exited 1", &clock);

        let cond = status.get_condition(&ConditionType::SUCCEEDED).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, "BuildFailed");
        assert_eq!(cond.message, "step 2 exited 1");
        assert!(!status.is_successful());
        assert!(status.is_done());
        assert!(status.completion_time.is_none());
    }

    #[test]
    fn test_done_is_not_resurrected() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        assert!(!status.is_done());
        status.initialize_conditions(&clock);
        assert!(!status.is_done());

        status.mark_succeeded(REASON_SUCCEEDED, "", &clock);
        assert!(status.is_done());

        status.mark_running(REASON_RUNNING, "step 3", &clock);
        status.initialize_conditions(&clock);
        assert!(status.is_done());
        assert!(status.is_successful());
    }

    #[test]
    fn test_set_condition_none_is_noop() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);
        let before = status.clone();

        assert!(!status.set_condition(None::<Condition>, &clock));
        assert_eq!(status, before);
    }

    #[test]
    fn test_not_convertible_leaves_succeeded_alone() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);

        let err = CannotConvertError::new("spec.resources", "not supported in v1");
        status.mark_not_convertible(&err, &clock);

        let cond = status.get_condition(&ConditionType::CONVERTIBLE).unwrap();
        assert_eq!(cond.severity, ConditionSeverity::Warning);
        assert_eq!(cond.reason, "spec.resources");
        assert!(cond.is_false());
        assert!(status.succeeded().unwrap().is_unknown());
    }

    #[test]
    fn test_run_conditions_have_no_dependents() {
        let set = RunStatus::condition_set();
        assert_eq!(set.happy(), &ConditionType::SUCCEEDED);
        assert!(set.dependents().is_empty());
        assert!(!set.is_dependent(&ConditionType::CONVERTIBLE));

        let mut status = RunStatus::default();
        assert!(!status.has_condition(&ConditionType::SUCCEEDED));
        status.initialize_conditions(&FixedClock::at(0));
        assert!(status.has_condition(&ConditionType::SUCCEEDED));
        assert!(!status.has_condition(&ConditionType::CONVERTIBLE));
    }

    #[test]
    fn test_record_completion_only_when_done_and_once() {
        let mut status = RunStatus::default();
        status.initialize_conditions(&FixedClock::at(0));
        assert!(!status.record_completion(&FixedClock::at(5)));

        status.mark_failed("BuildFailed", "", &FixedClock::at(10));
        assert!(status.record_completion(&FixedClock::at(10)));
        assert!(!status.record_completion(&FixedClock::at(20)));

        assert_eq!(status.completion_time, Some(FixedClock::at(10).utc()));
        assert_eq!(
            status.duration(FixedClock::at(99).utc()),
            Some(TimeDelta::seconds(10))
        );
    }

    #[test]
    fn test_duration_while_running_uses_now() {
        let mut status = RunStatus::default();
        assert!(status.duration(FixedClock::at(5).utc()).is_none());

        status.initialize_conditions(&FixedClock::at(0));
        assert_eq!(
            status.duration(FixedClock::at(42).utc()),
            Some(TimeDelta::seconds(42))
        );
    }

    #[test]
    fn test_steps_are_frozen_once_done() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);

        assert!(status.upsert_step(StepState::new("build", "step-build")));
        let mut running = StepState::new("build", "step-build");
        running.state = ContainerState::Running { started_at: None };
        assert!(status.upsert_step(running.clone()));
        assert!(status.upsert_sidecar(SidecarState::new("docker", "sidecar-docker")));
        assert_eq!(status.steps, vec![running]);

        status.mark_failed("BuildFailed", "", &clock);
        assert!(!status.upsert_step(StepState::new("push", "step-push")));
        assert!(!status.upsert_sidecar(SidecarState::new("proxy", "sidecar-proxy")));
        assert_eq!(status.steps.len(), 1);
        assert_eq!(status.sidecars.len(), 1);
    }

    #[test]
    fn test_set_result_replaces_same_name() {
        let mut status = RunStatus::default();
        status.set_result("digest", "sha256:aaa");
        status.set_result("url", "gcr.io/app");
        status.set_result("digest", "sha256:bbb");

        assert_eq!(status.task_results.len(), 2);
        assert_eq!(status.result("digest"), Some("sha256:bbb"));
        assert_eq!(status.result("missing"), None);
    }

    #[test]
    fn test_set_resource_result_replaces_same_key() {
        let mut status = RunStatus::default();
        let digest = |value: &str| PipelineResourceResult {
            key: "digest".into(),
            value: value.into(),
            resource_ref: "app-image".into(),
            result_type: String::new(),
        };
        status.set_resource_result(digest("sha256:aaa"));
        status.set_resource_result(digest("sha256:bbb"));

        assert_eq!(status.resources_result.len(), 1);
        assert_eq!(status.resource_result("digest").unwrap().value, "sha256:bbb");
        assert!(status.resource_result("url").is_none());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["resourcesResult"][0]["resourceRef"], "app-image");
        assert!(json["resourcesResult"][0].get("resultType").is_none());
    }

    #[test]
    fn test_cloud_event_retry_then_sent() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        let target = "http://sink.default.svc";

        status
            .record_cloud_event(target, DeliveryOutcome::Failed("503".into()), &clock)
            .unwrap();
        let delivery = status
            .record_cloud_event(target, DeliveryOutcome::Sent, &FixedClock::at(7))
            .unwrap();

        assert_eq!(delivery.status.condition, CloudEventCondition::Sent);
        assert_eq!(delivery.status.retry_count, 2);
        assert_eq!(delivery.status.sent_at, Some(FixedClock::at(7).utc()));
        assert_eq!(status.cloud_events.len(), 1);
    }

    #[test]
    fn test_cloud_event_targets_are_tracked_separately() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status
            .record_cloud_event("http://a", DeliveryOutcome::Sent, &clock)
            .unwrap();
        status
            .record_cloud_event("http://b", DeliveryOutcome::Failed("timeout".into()), &clock)
            .unwrap();

        assert!(status.cloud_event("http://a").unwrap().is_sent());
        assert_eq!(status.cloud_event("http://b").unwrap().status.error, "timeout");
        assert!(status
            .record_cloud_event("http://a", DeliveryOutcome::Sent, &clock)
            .is_err());
        assert_eq!(status.cloud_event("http://a").unwrap().status.retry_count, 1);
    }

    #[test]
    fn test_record_retry_snapshots_and_resets() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);
        status.pod_name = "build-pod-abc".into();
        status.upsert_step(StepState::new("build", "step-build"));
        status.upsert_sidecar(SidecarState::new("docker", "sidecar-docker"));
        status.set_result("digest", "sha256:aaa");
        status.set_resource_result(PipelineResourceResult {
            key: "commit".into(),
            value: "9f2c1e".into(),
            resource_ref: String::new(),
            result_type: String::new(),
        });
        status
            .record_cloud_event("http://sink", DeliveryOutcome::Sent, &clock)
            .unwrap();
        status.mark_failed("BuildFailed", "exit 1", &FixedClock::at(10));
        status.record_completion(&FixedClock::at(10));

        assert!(status.record_retry(10, &FixedClock::at(20)));

        assert_eq!(status.retry_count(), 1);
        let snapshot = &status.retries_status[0];
        assert_eq!(snapshot.pod_name(), "build-pod-abc");
        assert_eq!(snapshot.succeeded().unwrap().reason, "BuildFailed");
        assert_eq!(snapshot.completion_time(), Some(FixedClock::at(10).utc()));
        assert_eq!(snapshot.steps().len(), 1);
        assert_eq!(snapshot.sidecars()[0].name, "docker");
        assert_eq!(snapshot.task_results()[0].value, "sha256:aaa");
        assert_eq!(snapshot.resources_result()[0].key, "commit");
        assert!(snapshot.cloud_events()[0].is_sent());

        assert!(!status.is_done());
        assert!(status.pod_name.is_empty());
        assert!(status.steps.is_empty());
        assert!(status.sidecars.is_empty());
        assert!(status.task_results.is_empty());
        assert!(status.resources_result.is_empty());
        assert!(status.completion_time.is_none());
        assert!(status.cloud_event("http://sink").unwrap().is_sent());
        assert_eq!(status.start_time, Some(clock.utc()));
    }

    #[test]
    fn test_record_retry_requires_finished_run() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);

        assert!(!status.record_retry(10, &clock));
        assert_eq!(status.retry_count(), 0);
    }

    #[test]
    fn test_retry_history_is_bounded() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);

        for attempt in 0..5 {
            status.mark_failed("BuildFailed", format!("attempt {attempt}"), &clock);
            status.record_retry(3, &clock);
        }

        assert_eq!(status.retry_count(), 3);
        assert_eq!(status.retries_status[0].succeeded().unwrap().message, "attempt 2");
        assert_eq!(status.retries_status[2].succeeded().unwrap().message, "attempt 4");
    }

    #[test]
    fn test_snapshot_json_has_no_history() {
        let clock = FixedClock::at(0);
        let mut status = RunStatus::default();
        status.initialize_conditions(&clock);
        status.mark_failed("BuildFailed", "", &clock);
        status.record_retry(10, &clock);
        status.mark_failed("BuildFailed", "", &clock);
        status.record_retry(10, &clock);

        let json = serde_json::to_value(&status).unwrap();
        let history = json["retriesStatus"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|s| s.get("retriesStatus").is_none()));
    }
}
