use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerline_core::AppResult;
use ledgerline_domain::{AuditAction, AuditRecord, PageCursor};

/// Optional, AND-combined predicates over audit records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditFilters {
    /// Audited entity type.
    pub entity: Option<String>,
    /// Mutated entity identifier.
    pub entity_id: Option<String>,
    /// Acting principal.
    pub actor_id: Option<String>,
    /// Mutation kind.
    pub action: Option<AuditAction>,
    /// Originating request correlation id.
    pub request_id: Option<String>,
    /// Inclusive lower timestamp bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub to: Option<DateTime<Utc>>,
    /// Matches when any listed field is a top-level key of the diff.
    pub fields_changed: Vec<String>,
}

impl AuditFilters {
    /// Returns whether a record satisfies every configured predicate.
    #[must_use]
    pub fn matches(&self, record: &AuditRecord) -> bool {
        fn eq_if_set(expected: Option<&str>, actual: &str) -> bool {
            expected.is_none_or(|expected| expected == actual)
        }

        eq_if_set(self.entity.as_deref(), record.entity())
            && eq_if_set(self.entity_id.as_deref(), record.entity_id())
            && eq_if_set(self.actor_id.as_deref(), record.actor_id())
            && eq_if_set(self.request_id.as_deref(), record.request_id())
            && self.action.is_none_or(|action| action == record.action())
            && self.from.is_none_or(|from| record.timestamp() >= from)
            && self.to.is_none_or(|to| record.timestamp() <= to)
            && (self.fields_changed.is_empty() || record.changed_any(&self.fields_changed))
    }
}

/// Page request handed to [`AuditRecordRepository::find_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecordQuery {
    /// Record predicates.
    pub filters: AuditFilters,
    /// Only records strictly beyond this position.
    pub after: Option<PageCursor>,
    /// Maximum rows returned.
    pub limit: usize,
}

/// Append-only storage port for audit records.
#[async_trait]
pub trait AuditRecordRepository: Send + Sync {
    /// Persists one record.
    async fn append(&self, record: AuditRecord) -> AppResult<()>;

    /// Finds one record by identifier.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<AuditRecord>>;

    /// Lists matching records ordered by `(timestamp desc, id desc)`.
    async fn find_page(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>>;
}
