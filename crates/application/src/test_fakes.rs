use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeDelta, TimeZone, Utc};
use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::{AuditRecord, PageCursor};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::entity_ports::{entity_cursor, supplied_id};
use crate::{
    AuditRecordQuery, AuditRecordRepository, CREATED_AT_FIELD, ENTITY_ID_FIELD, EntityData,
    EntityFilter, EntityOrder, EntityStore, UPDATED_AT_FIELD,
};

/// Audit repository keeping records in a vector, optionally failing or
/// delaying writes.
#[derive(Default)]
pub struct FakeAuditRecordRepository {
    pub records: Mutex<Vec<AuditRecord>>,
    pub fail_appends: bool,
    pub append_delay: Option<Duration>,
}

impl FakeAuditRecordRepository {
    pub fn failing() -> Self {
        Self {
            fail_appends: true,
            ..Self::default()
        }
    }

    pub fn slow(append_delay: Duration) -> Self {
        Self {
            append_delay: Some(append_delay),
            ..Self::default()
        }
    }

    pub async fn snapshot(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditRecordRepository for FakeAuditRecordRepository {
    async fn append(&self, record: AuditRecord) -> AppResult<()> {
        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_appends {
            return Err(AppError::Internal("audit store unavailable".to_owned()));
        }
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<AuditRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|record| record.id() == id)
            .cloned())
    }

    async fn find_page(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        let mut records: Vec<AuditRecord> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|record| query.filters.matches(record))
            .filter(|record| {
                query
                    .after
                    .as_ref()
                    .is_none_or(|cursor| cursor.precedes(record.timestamp(), record.id()))
            })
            .cloned()
            .collect();
        records.sort_by(|left, right| {
            right
                .timestamp()
                .cmp(&left.timestamp())
                .then_with(|| right.id().cmp(left.id()))
        });
        records.truncate(query.limit);
        Ok(records)
    }
}

/// Entity store holding JSON objects in a map, optionally failing writes.
#[derive(Default)]
pub struct FakeEntityStore {
    pub rows: Mutex<HashMap<String, EntityData>>,
    pub fail_writes: bool,
    sequence: AtomicU64,
}

impl FakeEntityStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    fn next_stamp(&self) -> (String, String) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let base = Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .unwrap_or_default();
        let stamp = (base + TimeDelta::seconds(sequence as i64))
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        (format!("entity-{sequence:04}"), stamp)
    }
}

#[async_trait]
impl EntityStore for FakeEntityStore {
    async fn create(&self, mut data: EntityData) -> AppResult<EntityData> {
        if self.fail_writes {
            return Err(AppError::Internal("entity store unavailable".to_owned()));
        }
        let (generated, stamp) = self.next_stamp();
        let id = supplied_id(&data).map_or(generated, str::to_owned);
        data.insert(ENTITY_ID_FIELD.to_owned(), Value::from(id.clone()));
        data.insert(CREATED_AT_FIELD.to_owned(), Value::from(stamp.clone()));
        data.insert(UPDATED_AT_FIELD.to_owned(), Value::from(stamp));
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&id) {
            return Err(AppError::Conflict(format!("row '{id}' already exists")));
        }
        rows.insert(id, data.clone());
        Ok(data)
    }

    async fn update(&self, id: &str, patch: EntityData) -> AppResult<EntityData> {
        if self.fail_writes {
            return Err(AppError::Internal("entity store unavailable".to_owned()));
        }
        let (_, stamp) = self.next_stamp();
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("row '{id}' not found")))?;
        row.extend(patch);
        row.insert(UPDATED_AT_FIELD.to_owned(), Value::from(stamp));
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("entity store unavailable".to_owned()));
        }
        self.rows
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("row '{id}' not found")))
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<EntityData>> {
        Ok(self.rows.lock().await.get(id).cloned())
    }

    async fn find_many(
        &self,
        filter: EntityFilter,
        order: EntityOrder,
        limit: usize,
    ) -> AppResult<Vec<EntityData>> {
        let mut rows: Vec<(PageCursor, EntityData)> = self
            .rows
            .lock()
            .await
            .values()
            .filter(|row| filter.matches_fields(row))
            .filter_map(|row| entity_cursor(row).map(|position| (position, row.clone())))
            .filter(|(position, _)| match (&filter.beyond, order) {
                (None, _) => true,
                (Some(cursor), EntityOrder::NewestFirst) => {
                    cursor.precedes(position.timestamp(), position.id())
                }
                (Some(cursor), EntityOrder::OldestFirst) => {
                    (position.timestamp(), position.id()) > (cursor.timestamp(), cursor.id())
                }
            })
            .collect();
        rows.sort_by(|(left, _), (right, _)| {
            (right.timestamp(), right.id()).cmp(&(left.timestamp(), left.id()))
        });
        if order == EntityOrder::OldestFirst {
            rows.reverse();
        }
        rows.truncate(limit);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}
