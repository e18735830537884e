use std::sync::Arc;

use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::AuditRecord;

use crate::pagination::{InvalidCursorPolicy, Page, page_limit, resolve_cursor, split_page};
use crate::{AuditFilters, AuditRecordQuery, AuditRecordRepository};

/// One page of audit records.
pub type AuditPage = Page<AuditRecord>;

/// Read side of the audit trail: filtered, cursor-paginated queries.
#[derive(Clone)]
pub struct AuditQueryService {
    repository: Arc<dyn AuditRecordRepository>,
    invalid_cursor_policy: InvalidCursorPolicy,
}

impl AuditQueryService {
    /// Creates a service that rejects malformed cursors.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRecordRepository>) -> Self {
        Self {
            repository,
            invalid_cursor_policy: InvalidCursorPolicy::Reject,
        }
    }

    /// Overrides how malformed cursors are handled.
    #[must_use]
    pub fn with_invalid_cursor_policy(mut self, policy: InvalidCursorPolicy) -> Self {
        self.invalid_cursor_policy = policy;
        self
    }

    /// Returns records matching `filters`, newest first.
    ///
    /// Fetches one row beyond `limit` to learn whether another page exists;
    /// `next_cursor` points at the last row returned.
    pub async fn query(
        &self,
        mut filters: AuditFilters,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<AuditPage> {
        let limit = page_limit(limit)?;
        let after = resolve_cursor(cursor, self.invalid_cursor_policy)?;
        filters
            .fields_changed
            .retain(|field| !field.trim().is_empty());

        let rows = self
            .repository
            .find_page(AuditRecordQuery {
                filters,
                after,
                limit: limit + 1,
            })
            .await?;

        Ok(split_page(rows, limit, |record| Some(record.cursor())))
    }

    /// Returns one record by identifier.
    pub async fn find_by_id(&self, id: &str) -> AppResult<AuditRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("audit record '{id}' not found")))
    }
}
