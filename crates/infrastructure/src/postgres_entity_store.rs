use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use ledgerline_application::entity_ports::supplied_id;
use ledgerline_application::{
    CREATED_AT_FIELD, ENTITY_ID_FIELD, EntityData, EntityFilter, EntityOrder, EntityStore,
    UPDATED_AT_FIELD,
};
use ledgerline_core::{AppError, AppResult};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed raw entity store for one entity type.
///
/// Rows of every entity type share the `entity_records` table and are stored
/// as JSONB documents keyed by `(entity, id)`.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
    entity: String,
}

impl PostgresEntityStore {
    /// Creates a store for the named entity type.
    #[must_use]
    pub fn new(pool: PgPool, entity: impl Into<String>) -> Self {
        Self {
            pool,
            entity: entity.into(),
        }
    }

    fn not_found(&self, id: &str) -> AppError {
        AppError::NotFound(format!("{} '{id}' not found", self.entity))
    }
}

#[derive(Debug, FromRow)]
struct EntityRow {
    data: Value,
}

fn row_data(row: EntityRow) -> AppResult<EntityData> {
    match row.data {
        Value::Object(data) => Ok(data),
        other => Err(AppError::Internal(format!(
            "entity row holds non-object data: {other}"
        ))),
    }
}

fn stamp(at: DateTime<Utc>) -> Value {
    Value::from(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn create(&self, mut data: EntityData) -> AppResult<EntityData> {
        let id = supplied_id(&data)
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        let now = Utc::now().trunc_subsecs(6);
        data.insert(ENTITY_ID_FIELD.to_owned(), Value::from(id.clone()));
        data.insert(CREATED_AT_FIELD.to_owned(), stamp(now));
        data.insert(UPDATED_AT_FIELD.to_owned(), stamp(now));

        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            INSERT INTO entity_records (entity, id, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING data
            "#,
        )
        .bind(self.entity.as_str())
        .bind(id.as_str())
        .bind(Value::Object(data))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            let duplicate = error
                .as_database_error()
                .is_some_and(|database_error| database_error.is_unique_violation());
            if duplicate {
                debug!(entity = self.entity.as_str(), id = id.as_str(), "entity id already taken");
                return AppError::Conflict(format!("{} '{id}' already exists", self.entity));
            }
            AppError::Internal(format!(
                "failed to create {} '{id}': {error}",
                self.entity
            ))
        })?;

        row_data(row)
    }

    async fn update(&self, id: &str, mut patch: EntityData) -> AppResult<EntityData> {
        let now = Utc::now().trunc_subsecs(6);
        for managed in [ENTITY_ID_FIELD, CREATED_AT_FIELD] {
            patch.remove(managed);
        }
        patch.insert(UPDATED_AT_FIELD.to_owned(), stamp(now));

        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            UPDATE entity_records
            SET data = data || $3,
                updated_at = $4
            WHERE entity = $1 AND id = $2
            RETURNING data
            "#,
        )
        .bind(self.entity.as_str())
        .bind(id)
        .bind(Value::Object(patch))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update {} '{id}': {error}",
                self.entity
            ))
        })?
        .ok_or_else(|| self.not_found(id))?;

        row_data(row)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM entity_records
            WHERE entity = $1 AND id = $2
            "#,
        )
        .bind(self.entity.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete {} '{id}': {error}",
                self.entity
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(self.not_found(id));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<EntityData>> {
        sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT data
            FROM entity_records
            WHERE entity = $1 AND id = $2
            "#,
        )
        .bind(self.entity.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find {} '{id}': {error}", self.entity))
        })?
        .map(row_data)
        .transpose()
    }

    async fn find_many(
        &self,
        filter: EntityFilter,
        order: EntityOrder,
        limit: usize,
    ) -> AppResult<Vec<EntityData>> {
        // Field equality is expressed as JSONB containment of the filter object.
        let sql = match order {
            EntityOrder::NewestFirst => {
                r#"
                SELECT data
                FROM entity_records
                WHERE entity = $1
                    AND data @> $2
                    AND ($3::TIMESTAMPTZ IS NULL OR (created_at, id) < ($3, $4::TEXT))
                ORDER BY created_at DESC, id DESC
                LIMIT $5
                "#
            }
            EntityOrder::OldestFirst => {
                r#"
                SELECT data
                FROM entity_records
                WHERE entity = $1
                    AND data @> $2
                    AND ($3::TIMESTAMPTZ IS NULL OR (created_at, id) > ($3, $4::TEXT))
                ORDER BY created_at ASC, id ASC
                LIMIT $5
                "#
            }
        };

        let (beyond_at, beyond_id) = filter
            .beyond
            .map(|cursor| (Some(cursor.timestamp()), Some(cursor.id().to_owned())))
            .unwrap_or_default();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, EntityRow>(sql)
            .bind(self.entity.as_str())
            .bind(Value::Object(filter.field_equals))
            .bind(beyond_at)
            .bind(beyond_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list {} rows: {error}", self.entity))
            })?;

        rows.into_iter().map(row_data).collect()
    }
}
