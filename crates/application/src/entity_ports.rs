use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerline_core::AppResult;
use ledgerline_domain::PageCursor;
use serde_json::{Map, Value};

/// JSON object representation of a persisted entity.
pub type EntityData = Map<String, Value>;

/// Field holding the store-assigned entity identifier.
pub const ENTITY_ID_FIELD: &str = "id";
/// Field holding the store-assigned creation time (RFC3339).
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Field holding the store-assigned last modification time (RFC3339).
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Ordering applied by [`EntityStore::find_many`] on `(createdAt, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityOrder {
    /// Most recently created first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

/// Filter applied by [`EntityStore::find_many`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityFilter {
    /// Top-level fields that must equal the given JSON values.
    pub field_equals: EntityData,
    /// Only rows strictly beyond this position, in the requested order.
    pub beyond: Option<PageCursor>,
}

impl EntityFilter {
    /// Returns whether the entity satisfies the field equality constraints.
    #[must_use]
    pub fn matches_fields(&self, entity: &EntityData) -> bool {
        self.field_equals
            .iter()
            .all(|(field, expected)| entity.get(field) == Some(expected))
    }
}

/// Raw CRUD port over one entity type.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Persists a new entity and returns it with store-assigned fields.
    ///
    /// A non-empty string `id` supplied by the caller is kept; otherwise the
    /// store generates one. Fails with `Conflict` when the id is taken.
    async fn create(&self, data: EntityData) -> AppResult<EntityData>;

    /// Merges `patch` into an existing entity. Fails with `NotFound` when absent.
    async fn update(&self, id: &str, patch: EntityData) -> AppResult<EntityData>;

    /// Removes an entity. Fails with `NotFound` when absent.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Finds one entity by identifier.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<EntityData>>;

    /// Lists entities matching `filter` in `order`, at most `limit` rows.
    async fn find_many(
        &self,
        filter: EntityFilter,
        order: EntityOrder,
        limit: usize,
    ) -> AppResult<Vec<EntityData>>;
}

/// Returns the identifier of an entity, or an empty string when unset.
#[must_use]
pub fn entity_id(entity: &EntityData) -> &str {
    entity
        .get(ENTITY_ID_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Returns the caller-supplied identifier of a new entity, if any.
#[must_use]
pub fn supplied_id(entity: &EntityData) -> Option<&str> {
    entity
        .get(ENTITY_ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
}

/// Returns the `(createdAt, id)` pagination position of an entity.
#[must_use]
pub fn entity_cursor(entity: &EntityData) -> Option<PageCursor> {
    let created_at = entity.get(CREATED_AT_FIELD).and_then(Value::as_str)?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .ok()?
        .with_timezone(&Utc);
    let id = entity_id(entity);

    (!id.is_empty()).then(|| PageCursor::new(created_at, id))
}
