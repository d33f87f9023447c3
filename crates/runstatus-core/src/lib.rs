//! Run lifecycle tracking.
//!
//! Pure domain logic for the status of one TaskRun: the condition set and
//! its aggregate `Succeeded` condition, start/completion bookkeeping,
//! timeout and cancellation checks, per-container state, cloud event
//! delivery records and retry history. No network, storage or runtime
//! dependencies: callers read a run, call into these types, and persist
//! the result.

pub mod cloud_event;
pub mod condition;
pub mod condition_set;
pub mod config;
pub mod container;
pub mod error;
pub mod ids;
pub mod run;
pub mod status;
pub mod timeout;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use cloud_event::{CloudEventCondition, CloudEventDelivery, DeliveryOutcome};
pub use condition::{Condition, ConditionSeverity, ConditionStatus, ConditionType};
pub use condition_set::{ConditionManager, ConditionSet};
pub use config::RunConfig;
pub use container::{ContainerState, SidecarState, StepState};
pub use error::{CannotConvertError, CoreError};
pub use ids::{RunKey, Uid};
pub use run::{OwnerReference, SpecStatus, TaskRun, TaskRunSpec};
pub use status::{
    PipelineResourceResult, RetrySnapshot, RunStatus, StatusFields, TaskRunResult,
};
pub use timeout::TimeoutPolicy;
