//! Condition sets: an aggregate "happy" condition derived from its dependents.
//!
//! The aggregate is the logical AND of the dependent conditions:
//! `False` if any dependent is `False`, `Unknown` if any dependent is
//! `Unknown` (or missing) and none is `False`, `True` only when every
//! dependent is `True`. The aggregate inherits severity, reason and
//! message from the dependent that decided it; among several candidates
//! the most recently written one wins.
//!
//! A set without dependents (see [`ConditionSet::batch`]) has its
//! aggregate written directly.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::condition::{Condition, ConditionStatus, ConditionType};

const NO_DEPENDENTS: &[ConditionType] = &[];

/// Declares which condition types a status tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSet {
    happy: ConditionType,
    dependents: Cow<'static, [ConditionType]>,
}

impl ConditionSet {
    /// A set with only the `Succeeded` condition, as used by batch runs.
    pub const fn batch() -> Self {
        Self {
            happy: ConditionType::SUCCEEDED,
            dependents: Cow::Borrowed(NO_DEPENDENTS),
        }
    }

    /// Create a set with an aggregate and its dependents.
    ///
    /// Duplicates, empty names and the aggregate itself are dropped from
    /// the dependent list.
    pub fn new(happy: ConditionType, dependents: impl IntoIterator<Item = ConditionType>) -> Self {
        let mut deps: Vec<ConditionType> = Vec::new();
        for dep in dependents {
            if dep != happy && !dep.is_empty() && !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        Self {
            happy,
            dependents: Cow::Owned(deps),
        }
    }

    /// The aggregate condition type.
    pub fn happy(&self) -> &ConditionType {
        &self.happy
    }

    pub fn dependents(&self) -> &[ConditionType] {
        &self.dependents
    }

    pub fn is_dependent(&self, t: &ConditionType) -> bool {
        self.dependents.iter().any(|d| d == t)
    }

    /// Borrow a list of conditions for reading and writing under this set.
    ///
    /// `now` stamps every transition made through the returned manager.
    pub fn manage<'a>(
        &'a self,
        conditions: &'a mut Vec<Condition>,
        now: DateTime<Utc>,
    ) -> ConditionManager<'a> {
        ConditionManager {
            set: self,
            conditions,
            now,
        }
    }
}

/// Applies a [`ConditionSet`]'s rules to a list of conditions.
pub struct ConditionManager<'a> {
    set: &'a ConditionSet,
    conditions: &'a mut Vec<Condition>,
    now: DateTime<Utc>,
}

impl ConditionManager<'_> {
    /// Get a condition by type. Never fabricates a default.
    pub fn get(&self, t: &ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| &c.r#type == t)
    }

    /// Get the aggregate condition.
    pub fn happy(&self) -> Option<&Condition> {
        self.get(&self.set.happy)
    }

    /// Set every declared condition that is missing to `Unknown`.
    ///
    /// Existing conditions are left alone, so a `True` or `False` value
    /// never regresses.
    pub fn initialize(&mut self) {
        let set = self.set;
        for t in std::iter::once(&set.happy).chain(set.dependents.iter()) {
            if self.get(t).is_none() {
                self.upsert(Condition::unknown(t.clone()));
            }
        }
    }

    /// Write a condition, replacing any condition of the same type.
    ///
    /// Returns true if the stored conditions changed. Writes with an empty
    /// type, and `Unknown` writes over a terminal aggregate, are ignored.
    pub fn set(&mut self, condition: Condition) -> bool {
        if condition.r#type.is_empty() {
            debug!("Ignoring condition with empty type");
            return false;
        }

        let set = self.set;
        let before = self.happy().map(|c| c.status);

        if condition.r#type == set.happy
            && condition.is_unknown()
            && before.is_some_and(|s| s.is_terminal())
        {
            debug!(
                reason = %condition.reason,
                "Ignoring Unknown write over terminal aggregate"
            );
            return false;
        }

        let recompute = set.is_dependent(&condition.r#type);
        let mut changed = self.upsert(condition);
        if recompute {
            changed |= self.recompute_happy();
        }

        let after = self.happy().map(|c| c.status);
        if before != after {
            debug!(
                condition = %set.happy,
                from = ?before,
                to = ?after,
                "Aggregate condition changed"
            );
        }

        changed
    }

    /// Replace or append, keeping the transition time when the status value
    /// did not change. The written condition moves to the end of the list,
    /// so list order is write order.
    fn upsert(&mut self, mut condition: Condition) -> bool {
        let index = self
            .conditions
            .iter()
            .position(|c| c.r#type == condition.r#type);
        let previous = index.map(|i| self.conditions.remove(i));

        condition.last_transition_time = match &previous {
            Some(prev) if prev.status == condition.status => {
                prev.last_transition_time.or(Some(self.now))
            }
            _ => Some(self.now),
        };

        let changed = previous.as_ref() != Some(&condition);
        self.conditions.push(condition);
        changed
    }

    fn recompute_happy(&mut self) -> bool {
        let set = self.set;
        let aggregate = {
            let deps: Vec<&Condition> = self
                .conditions
                .iter()
                .filter(|c| set.is_dependent(&c.r#type))
                .collect();

            let derive = |status: ConditionStatus, from: &Condition| Condition {
                r#type: set.happy.clone(),
                status,
                severity: from.severity,
                last_transition_time: None,
                reason: from.reason.clone(),
                message: from.message.clone(),
            };

            if let Some(&c) = deps.iter().rev().find(|c| c.is_false()) {
                derive(ConditionStatus::False, c)
            } else if let Some(&c) = deps.iter().rev().find(|c| c.is_unknown()) {
                derive(ConditionStatus::Unknown, c)
            } else if deps.len() < set.dependents.len() {
                Condition::unknown(set.happy.clone())
            } else {
                Condition::new(set.happy.clone(), ConditionStatus::True)
            }
        };
        self.upsert(aggregate)
    }
}
