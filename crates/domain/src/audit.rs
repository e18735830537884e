use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use ledgerline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::PageCursor;

/// Mutation kind captured by an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Entity was created.
    Create,
    /// Entity was modified.
    Update,
    /// Entity was removed.
    Delete,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!("unknown audit action '{value}'"))),
        }
    }
}

/// Before/after pair for one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value prior to the update, `null` when the field was absent.
    pub before: Value,
    /// Value after the update.
    pub after: Value,
}

/// Structured field-level diff stored on an audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiffPayload {
    /// Full policy-filtered state, used for create and delete.
    Snapshot(Map<String, Value>),
    /// Changed fields only, used for update.
    Changes(BTreeMap<String, FieldChange>),
}

impl DiffPayload {
    /// Returns whether the diff carries the given top-level field.
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        match self {
            Self::Snapshot(values) => values.contains_key(field),
            Self::Changes(changes) => changes.contains_key(field),
        }
    }

    /// Converts the diff into its stored JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Snapshot(values) => Value::Object(values.clone()),
            Self::Changes(changes) => Value::Object(
                changes
                    .iter()
                    .map(|(field, change)| {
                        let mut pair = Map::new();
                        pair.insert("before".to_owned(), change.before.clone());
                        pair.insert("after".to_owned(), change.after.clone());
                        (field.clone(), Value::Object(pair))
                    })
                    .collect(),
            ),
        }
    }

    /// Restores a diff from its stored JSON form.
    ///
    /// The shape is chosen by the action of the owning record.
    pub fn from_value(action: AuditAction, value: Value) -> AppResult<Self> {
        let Value::Object(values) = value else {
            return Err(AppError::Internal(
                "stored audit diff must be a JSON object".to_owned(),
            ));
        };

        match action {
            AuditAction::Create | AuditAction::Delete => Ok(Self::Snapshot(values)),
            AuditAction::Update => values
                .into_iter()
                .map(|(field, pair)| {
                    serde_json::from_value::<FieldChange>(pair)
                        .map(|change| (field.clone(), change))
                        .map_err(|error| {
                            AppError::Internal(format!(
                                "stored update diff for field '{field}' is malformed: {error}"
                            ))
                        })
                })
                .collect::<AppResult<BTreeMap<_, _>>>()
                .map(Self::Changes),
        }
    }
}

/// Attributes of an audit record supplied by its writer.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordDraft {
    /// Audited entity type.
    pub entity: String,
    /// Identifier of the mutated entity.
    pub entity_id: String,
    /// Mutation kind.
    pub action: AuditAction,
    /// Acting principal.
    pub actor_id: String,
    /// Originating request correlation id.
    pub request_id: String,
    /// Field-level diff, absent when nothing could be computed.
    pub diff: Option<DiffPayload>,
}

/// Immutable audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    id: String,
    entity: String,
    entity_id: String,
    action: AuditAction,
    actor_id: String,
    diff: Option<DiffPayload>,
    request_id: String,
    timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Creates a record with a fresh UUIDv7 identifier and the current time.
    ///
    /// The timestamp is truncated to microseconds so it survives storage
    /// engines with microsecond resolution unchanged.
    #[must_use]
    pub fn new(draft: AuditRecordDraft) -> Self {
        Self::restore(
            Uuid::now_v7().to_string(),
            Utc::now().trunc_subsecs(6),
            draft,
        )
    }

    /// Rebuilds a previously persisted record.
    #[must_use]
    pub fn restore(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        draft: AuditRecordDraft,
    ) -> Self {
        Self {
            id: id.into(),
            entity: draft.entity,
            entity_id: draft.entity_id,
            action: draft.action,
            actor_id: draft.actor_id,
            diff: draft.diff,
            request_id: draft.request_id,
            timestamp,
        }
    }

    /// Returns the unique record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the audited entity type.
    #[must_use]
    pub fn entity(&self) -> &str {
        self.entity.as_str()
    }

    /// Returns the mutated entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_str()
    }

    /// Returns the mutation kind.
    #[must_use]
    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns the acting principal.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        self.actor_id.as_str()
    }

    /// Returns the recorded diff.
    #[must_use]
    pub fn diff(&self) -> Option<&DiffPayload> {
        self.diff.as_ref()
    }

    /// Returns the originating request correlation id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        self.request_id.as_str()
    }

    /// Returns the write time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the pagination position of this record.
    #[must_use]
    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.timestamp, self.id.clone())
    }

    /// Returns whether the stored diff names any of the given fields.
    #[must_use]
    pub fn changed_any(&self, fields: &[String]) -> bool {
        self.diff
            .as_ref()
            .is_some_and(|diff| fields.iter().any(|field| diff.contains_field(field)))
    }
}
