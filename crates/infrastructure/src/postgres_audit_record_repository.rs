use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerline_application::{AuditRecordQuery, AuditRecordRepository};
use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::{AuditAction, AuditRecord, AuditRecordDraft, DiffPayload};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed append-only audit record repository.
#[derive(Clone)]
pub struct PostgresAuditRecordRepository {
    pool: PgPool,
}

impl PostgresAuditRecordRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRecordRow {
    id: String,
    entity: String,
    entity_id: String,
    action: String,
    actor_id: String,
    request_id: String,
    diff: Option<Value>,
    recorded_at: DateTime<Utc>,
}

fn audit_record_from_row(row: AuditRecordRow) -> AppResult<AuditRecord> {
    let action = row.action.parse::<AuditAction>().map_err(|error| {
        AppError::Internal(format!(
            "audit record '{}' has unknown action: {error}",
            row.id
        ))
    })?;
    let diff = row
        .diff
        .map(|value| DiffPayload::from_value(action, value))
        .transpose()
        .map_err(|error| {
            AppError::Internal(format!(
                "audit record '{}' has malformed diff: {error}",
                row.id
            ))
        })?;

    Ok(AuditRecord::restore(
        row.id,
        row.recorded_at,
        AuditRecordDraft {
            entity: row.entity,
            entity_id: row.entity_id,
            action,
            actor_id: row.actor_id,
            request_id: row.request_id,
            diff,
        },
    ))
}

#[async_trait]
impl AuditRecordRepository for PostgresAuditRecordRepository {
    async fn append(&self, record: AuditRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id,
                entity,
                entity_id,
                action,
                actor_id,
                request_id,
                diff,
                recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id())
        .bind(record.entity())
        .bind(record.entity_id())
        .bind(record.action().as_str())
        .bind(record.actor_id())
        .bind(record.request_id())
        .bind(record.diff().map(DiffPayload::to_value))
        .bind(record.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append audit record '{}': {error}",
                record.id()
            ))
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<AuditRecord>> {
        sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT id, entity, entity_id, action, actor_id, request_id, diff, recorded_at
            FROM audit_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find audit record '{id}': {error}")))?
        .map(audit_record_from_row)
        .transpose()
    }

    async fn find_page(&self, query: AuditRecordQuery) -> AppResult<Vec<AuditRecord>> {
        let filters = query.filters;
        let (after_at, after_id) = query
            .after
            .map(|cursor| (Some(cursor.timestamp()), Some(cursor.id().to_owned())))
            .unwrap_or_default();
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, AuditRecordRow>(
            r#"
            SELECT id, entity, entity_id, action, actor_id, request_id, diff, recorded_at
            FROM audit_records
            WHERE ($1::TEXT IS NULL OR entity = $1)
                AND ($2::TEXT IS NULL OR entity_id = $2)
                AND ($3::TEXT IS NULL OR actor_id = $3)
                AND ($4::TEXT IS NULL OR action = $4)
                AND ($5::TEXT IS NULL OR request_id = $5)
                AND ($6::TIMESTAMPTZ IS NULL OR recorded_at >= $6)
                AND ($7::TIMESTAMPTZ IS NULL OR recorded_at <= $7)
                AND (
                    cardinality($8::TEXT[]) = 0
                    OR (jsonb_typeof(diff) = 'object' AND diff ?| $8::TEXT[])
                )
                AND ($9::TIMESTAMPTZ IS NULL OR (recorded_at, id) < ($9, $10::TEXT))
            ORDER BY recorded_at DESC, id DESC
            LIMIT $11
            "#,
        )
        .bind(filters.entity)
        .bind(filters.entity_id)
        .bind(filters.actor_id)
        .bind(filters.action.map(|action| action.as_str()))
        .bind(filters.request_id)
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.fields_changed)
        .bind(after_at)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit records: {error}")))?;

        rows.into_iter().map(audit_record_from_row).collect()
    }
}
