use async_trait::async_trait;
use ledgerline_application::{AuditRecordQuery, AuditRecordRepository};
use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::AuditRecord;
use tokio::sync::RwLock;

/// In-memory append-only audit record store.
#[derive(Debug, Default)]
pub struct InMemoryAuditRecordRepository {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditRecordRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRecordRepository for InMemoryAuditRecordRepository {
    async fn append(&self, record: AuditRecord) -> AppResult<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(AppError::Conflict(format!(
                "audit record '{}' already exists",
                record.id()
            )));
        }
        records.push(record);

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<AuditRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.id() == id)
            .cloned())
    }

    async fn find_page(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        let records = self.records.read().await;

        let mut matching: Vec<&AuditRecord> = records
            .iter()
            .filter(|record| query.filters.matches(record))
            .filter(|record| {
                query
                    .after
                    .as_ref()
                    .is_none_or(|cursor| cursor.precedes(record.timestamp(), record.id()))
            })
            .collect();

        matching.sort_by(|left, right| {
            (right.timestamp(), right.id()).cmp(&(left.timestamp(), left.id()))
        });

        Ok(matching
            .into_iter()
            .take(query.limit)
            .cloned()
            .collect())
    }
}
