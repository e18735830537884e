use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, SubsecRound, Utc};
use ledgerline_application::entity_ports::{entity_cursor, supplied_id};
use ledgerline_application::{
    CREATED_AT_FIELD, ENTITY_ID_FIELD, EntityData, EntityFilter, EntityOrder, EntityStore,
    UPDATED_AT_FIELD,
};
use ledgerline_core::{AppError, AppResult};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory raw entity store for one entity type.
#[derive(Debug)]
pub struct InMemoryEntityStore {
    entity: String,
    rows: RwLock<HashMap<String, EntityData>>,
}

impl InMemoryEntityStore {
    /// Creates an empty store for the named entity type.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            rows: RwLock::new(HashMap::new()),
        }
    }
}

fn now_stamp() -> Value {
    Value::from(
        Utc::now()
            .trunc_subsecs(6)
            .to_rfc3339_opts(SecondsFormat::Micros, true),
    )
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create(&self, mut data: EntityData) -> AppResult<EntityData> {
        let id = supplied_id(&data)
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        let stamp = now_stamp();
        data.insert(ENTITY_ID_FIELD.to_owned(), Value::from(id.clone()));
        data.insert(CREATED_AT_FIELD.to_owned(), stamp.clone());
        data.insert(UPDATED_AT_FIELD.to_owned(), stamp);

        let mut rows = self.rows.write().await;
        if rows.contains_key(&id) {
            return Err(AppError::Conflict(format!(
                "{} '{id}' already exists",
                self.entity
            )));
        }
        rows.insert(id, data.clone());

        Ok(data)
    }

    async fn update(&self, id: &str, mut patch: EntityData) -> AppResult<EntityData> {
        for managed in [ENTITY_ID_FIELD, CREATED_AT_FIELD] {
            patch.remove(managed);
        }
        patch.insert(UPDATED_AT_FIELD.to_owned(), now_stamp());

        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("{} '{id}' not found", self.entity)))?;
        row.extend(patch);

        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.rows
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("{} '{id}' not found", self.entity)))
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<EntityData>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_many(
        &self,
        filter: EntityFilter,
        order: EntityOrder,
        limit: usize,
    ) -> AppResult<Vec<EntityData>> {
        let rows = self.rows.read().await;

        let mut matching: Vec<_> = rows
            .values()
            .filter(|row| filter.matches_fields(row))
            .filter_map(|row| entity_cursor(row).map(|position| (position, row)))
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

        matching.sort_by(|(left, _), (right, _)| {
            (left.timestamp(), left.id()).cmp(&(right.timestamp(), right.id()))
        });
        if order == EntityOrder::NewestFirst {
            matching.reverse();
        }

        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use ledgerline_application::{EntityData, EntityFilter, EntityOrder, EntityStore};
    use ledgerline_application::entity_ports::{entity_cursor, entity_id};
    use ledgerline_core::AppError;
    use serde_json::{Value, json};

    use super::InMemoryEntityStore;

    fn data(value: Value) -> EntityData {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn create_assigns_identity_and_timestamps() {
        let store = InMemoryEntityStore::new("Book");

        let created = store.create(data(json!({"title": "Clean Code"}))).await;

        assert!(created.is_ok());
        let created = created.unwrap_or_default();
        assert!(!entity_id(&created).is_empty());
        assert!(entity_cursor(&created).is_some());
        assert_eq!(created.get("createdAt"), created.get("updatedAt"));
    }

    #[tokio::test]
    async fn update_merges_patch_and_protects_identity() {
        let store = InMemoryEntityStore::new("Book");
        let created = store
            .create(data(json!({"title": "A", "authors": "B"})))
            .await
            .unwrap_or_default();
        let id = entity_id(&created).to_owned();

        let updated = store
            .update(id.as_str(), data(json!({"title": "C", "id": "hijack"})))
            .await;

        assert!(updated.is_ok_and(|book| {
            book.get("title") == Some(&json!("C"))
                && book.get("authors") == Some(&json!("B"))
                && entity_id(&book) == id
                && book.get("createdAt") == created.get("createdAt")
        }));
    }

    #[tokio::test]
    async fn supplied_ids_are_kept_and_must_be_unique() {
        let store = InMemoryEntityStore::new("Book");

        let created = store
            .create(data(json!({"id": "book-1", "title": "Clean Code"})))
            .await;
        let duplicate = store
            .create(data(json!({"id": "book-1", "title": "Other"})))
            .await;

        assert!(created.is_ok_and(|book| entity_id(&book) == "book-1"));
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = InMemoryEntityStore::new("Book");

        assert!(matches!(
            store.update("missing", EntityData::new()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(store.find_by_id("missing").await, Ok(None)));
    }

    #[tokio::test]
    async fn find_many_orders_filters_and_resumes() {
        let store = InMemoryEntityStore::new("Book");
        for (title, shelf) in [("one", "a"), ("two", "b"), ("three", "a"), ("four", "a")] {
            assert!(
                store
                    .create(data(json!({"title": title, "shelf": shelf})))
                    .await
                    .is_ok()
            );
        }

        let titles = |rows: Vec<EntityData>| {
            rows.iter()
                .filter_map(|row| row.get("title").and_then(Value::as_str))
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };

        let shelf_a = EntityFilter {
            field_equals: data(json!({"shelf": "a"})),
            ..EntityFilter::default()
        };
        let newest = store
            .find_many(shelf_a.clone(), EntityOrder::NewestFirst, 2)
            .await
            .unwrap_or_default();
        let resume_from = newest.last().and_then(entity_cursor);
        assert_eq!(titles(newest), vec!["four", "three"]);

        let rest = store
            .find_many(
                EntityFilter {
                    beyond: resume_from,
                    ..shelf_a.clone()
                },
                EntityOrder::NewestFirst,
                10,
            )
            .await
            .unwrap_or_default();
        assert_eq!(titles(rest), vec!["one"]);

        let oldest = store
            .find_many(shelf_a, EntityOrder::OldestFirst, 10)
            .await
            .unwrap_or_default();
        assert_eq!(titles(oldest), vec!["one", "three", "four"]);
    }
}
