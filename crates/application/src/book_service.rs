//! Book catalogue service.
//!
//! Books are plain JSON entities persisted through an [`EntityStore`]. In the
//! running system that store is a change-tracking decorator, so every
//! mutation issued here lands in the audit trail without this service knowing.

use std::sync::Arc;

use ledgerline_core::{AppError, AppResult, RequestContext};
use serde_json::Value;

use crate::entity_ports::entity_cursor;
use crate::pagination::{InvalidCursorPolicy, Page, page_limit, resolve_cursor, split_page};
use crate::{ENTITY_ID_FIELD, EntityData, EntityFilter, EntityOrder, EntityStore};

/// Actor recorded when a book is written outside any request.
pub const SYSTEM_ACTOR: &str = "system";

const TITLE_FIELD: &str = "title";
const AUTHORS_FIELD: &str = "authors";
const PUBLISHED_BY_FIELD: &str = "publishedBy";
const CREATED_BY_FIELD: &str = "createdBy";
const UPDATED_BY_FIELD: &str = "updatedBy";

/// Input payload for book creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBookInput {
    /// Book title.
    pub title: String,
    /// Author names as free text.
    pub authors: String,
    /// Publisher name.
    pub published_by: String,
}

/// Input payload for partial book updates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateBookInput {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement author names.
    pub authors: Option<String>,
    /// Replacement publisher name.
    pub published_by: Option<String>,
}

/// Application service for book CRUD.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn EntityStore>,
}

impl BookService {
    /// Creates a service over the given book store.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Creates a book stamped with the acting principal.
    pub async fn create(&self, input: CreateBookInput) -> AppResult<EntityData> {
        self.store.create(book_data(input)?).await
    }

    /// Creates a book under a caller-chosen identifier.
    pub async fn create_with_id(&self, id: &str, input: CreateBookInput) -> AppResult<EntityData> {
        let mut data = book_data(input)?;
        data.insert(
            ENTITY_ID_FIELD.to_owned(),
            Value::from(required_text(ENTITY_ID_FIELD, id.to_owned())?),
        );
        self.store.create(data).await
    }

    /// Applies a partial update; at least one field must be supplied.
    pub async fn update(&self, id: &str, input: UpdateBookInput) -> AppResult<EntityData> {
        let mut patch = EntityData::new();
        for (field, value) in [
            (TITLE_FIELD, input.title),
            (AUTHORS_FIELD, input.authors),
            (PUBLISHED_BY_FIELD, input.published_by),
        ] {
            if let Some(value) = value {
                patch.insert(field.to_owned(), Value::from(required_text(field, value)?));
            }
        }

        if patch.is_empty() {
            return Err(AppError::Validation(
                "at least one field must be provided".to_owned(),
            ));
        }

        patch.insert(UPDATED_BY_FIELD.to_owned(), Value::from(current_actor()));
        self.store.update(id, patch).await
    }

    /// Deletes a book.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.store.delete(id).await
    }

    /// Returns one book by identifier.
    pub async fn find_by_id(&self, id: &str) -> AppResult<EntityData> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book '{id}' not found")))
    }

    /// Lists books newest first, cursor paginated on `(createdAt, id)`.
    ///
    /// Malformed cursors restart from the first page.
    pub async fn list_page(
        &self,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<Page<EntityData>> {
        let limit = page_limit(limit)?;
        let beyond = resolve_cursor(cursor, InvalidCursorPolicy::Ignore)?;
        let rows = self
            .store
            .find_many(
                EntityFilter {
                    beyond,
                    ..EntityFilter::default()
                },
                EntityOrder::NewestFirst,
                limit + 1,
            )
            .await?;

        Ok(split_page(rows, limit, entity_cursor))
    }
}

fn book_data(input: CreateBookInput) -> AppResult<EntityData> {
    let actor = current_actor();
    let mut data = EntityData::new();
    data.insert(
        TITLE_FIELD.to_owned(),
        Value::from(required_text(TITLE_FIELD, input.title)?),
    );
    data.insert(
        AUTHORS_FIELD.to_owned(),
        Value::from(required_text(AUTHORS_FIELD, input.authors)?),
    );
    data.insert(
        PUBLISHED_BY_FIELD.to_owned(),
        Value::from(required_text(PUBLISHED_BY_FIELD, input.published_by)?),
    );
    data.insert(CREATED_BY_FIELD.to_owned(), Value::from(actor.clone()));
    data.insert(UPDATED_BY_FIELD.to_owned(), Value::from(actor));

    Ok(data)
}

fn current_actor() -> String {
    RequestContext::current()
        .map(|context| context.actor_id().to_owned())
        .unwrap_or_else(|| SYSTEM_ACTOR.to_owned())
}

fn required_text(field: &str, value: String) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }

    Ok(trimmed.to_owned())
}
