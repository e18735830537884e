use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::dto::{BookPageResponse, CreateBookRequest, UpdateBookRequest};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookListQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_books_handler(
    State(state): State<AppState>,
    Query(query): Query<BookListQuery>,
) -> ApiResult<Json<BookPageResponse>> {
    let page = state
        .book_service
        .list_page(query.cursor.as_deref(), query.limit)
        .await?;

    Ok(Json(BookPageResponse::from(page)))
}

pub async fn create_book_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let book = state.book_service.create(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(Value::Object(book))))
}

pub async fn get_book_handler(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let book = state.book_service.find_by_id(book_id.as_str()).await?;

    Ok(Json(Value::Object(book)))
}

pub async fn update_book_handler(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Json(payload): Json<UpdateBookRequest>,
) -> ApiResult<Json<Value>> {
    let book = state
        .book_service
        .update(book_id.as_str(), payload.into())
        .await?;

    Ok(Json(Value::Object(book)))
}

pub async fn delete_book_handler(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.book_service.delete(book_id.as_str()).await?;

    Ok(StatusCode::NO_CONTENT)
}
