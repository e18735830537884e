use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    AuditAction, AuditPolicyTable, DiffPayload, EntityAuditPolicy, FieldChange, REDACTED_VALUE,
};

/// Result of diffing one mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
    /// Entity is not subject to auditing; nothing is recorded.
    Untracked,
    /// Entity is tracked but an update lacked its before or after state.
    NoDiff,
    /// Policy-filtered diff.
    Diff(DiffPayload),
}

/// Computes policy-filtered field-level diffs.
///
/// Field values are compared with structural `serde_json::Value` equality,
/// so two independently built objects with the same content are equal.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    policies: Arc<AuditPolicyTable>,
}

impl DiffEngine {
    /// Creates an engine over a loaded policy table.
    #[must_use]
    pub fn new(policies: Arc<AuditPolicyTable>) -> Self {
        Self { policies }
    }

    /// Returns whether mutations of `entity` produce audit records.
    #[must_use]
    pub fn is_tracked(&self, entity: &str) -> bool {
        self.policies.tracked_policy(entity).is_some()
    }

    /// Computes the diff for one mutation of `entity`.
    #[must_use]
    pub fn compute(
        &self,
        entity: &str,
        action: AuditAction,
        before: Option<&Map<String, Value>>,
        after: Option<&Map<String, Value>>,
    ) -> DiffOutcome {
        let Some(policy) = self.policies.tracked_policy(entity) else {
            return DiffOutcome::Untracked;
        };

        let payload = match action {
            AuditAction::Create => DiffPayload::Snapshot(filter_snapshot(policy, after)),
            AuditAction::Delete => DiffPayload::Snapshot(filter_snapshot(policy, before)),
            AuditAction::Update => {
                let (Some(before), Some(after)) = (before, after) else {
                    return DiffOutcome::NoDiff;
                };
                DiffPayload::Changes(filter_changes(policy, changed_fields(before, after)))
            }
        };

        DiffOutcome::Diff(payload)
    }
}

fn changed_fields(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
) -> BTreeMap<String, FieldChange> {
    after
        .iter()
        .filter_map(|(field, after_value)| {
            let before_value = before.get(field);
            (before_value != Some(after_value)).then(|| {
                (
                    field.clone(),
                    FieldChange {
                        before: before_value.cloned().unwrap_or(Value::Null),
                        after: after_value.clone(),
                    },
                )
            })
        })
        .collect()
}

fn filter_snapshot(
    policy: &EntityAuditPolicy,
    snapshot: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    snapshot
        .into_iter()
        .flatten()
        .filter(|(field, _)| !policy.is_excluded(field))
        .map(|(field, value)| {
            let value = if policy.is_redacted(field) {
                Value::String(REDACTED_VALUE.to_owned())
            } else {
                value.clone()
            };
            (field.clone(), value)
        })
        .collect()
}

fn filter_changes(
    policy: &EntityAuditPolicy,
    changes: BTreeMap<String, FieldChange>,
) -> BTreeMap<String, FieldChange> {
    changes
        .into_iter()
        .filter(|(field, _)| !policy.is_excluded(field))
        .map(|(field, change)| {
            if policy.is_redacted(&field) {
                let redacted = FieldChange {
                    before: Value::String(REDACTED_VALUE.to_owned()),
                    after: Value::String(REDACTED_VALUE.to_owned()),
                };
                return (field, redacted);
            }
            (field, change)
        })
        .collect()
}
