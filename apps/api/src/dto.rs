use chrono::SecondsFormat;
use ledgerline_application::{AuditPage, CreateBookInput, EntityData, Page, UpdateBookInput};
use ledgerline_domain::{AuditRecord, DiffPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for book creation.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-book-request.ts"
)]
pub struct CreateBookRequest {
    pub title: String,
    pub authors: String,
    pub published_by: String,
}

impl From<CreateBookRequest> for CreateBookInput {
    fn from(value: CreateBookRequest) -> Self {
        Self {
            title: value.title,
            authors: value.authors,
            published_by: value.published_by,
        }
    }
}

/// Incoming payload for partial book updates.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-book-request.ts"
)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub published_by: Option<String>,
}

impl From<UpdateBookRequest> for UpdateBookInput {
    fn from(value: UpdateBookRequest) -> Self {
        Self {
            title: value.title,
            authors: value.authors,
            published_by: value.published_by,
        }
    }
}

/// One page of books.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/book-page-response.ts"
)]
pub struct BookPageResponse {
    #[ts(type = "Array<Record<string, unknown>>")]
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub next_cursor: Option<String>,
}

impl From<Page<EntityData>> for BookPageResponse {
    fn from(value: Page<EntityData>) -> Self {
        Self {
            data: value.data.into_iter().map(Value::Object).collect(),
            next_cursor: value.next_cursor,
        }
    }
}

/// API representation of an audit record.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-record-response.ts"
)]
pub struct AuditRecordResponse {
    pub id: String,
    pub entity: String,
    pub entity_id: String,
    pub action: String,
    pub actor_id: String,
    #[ts(type = "Record<string, unknown> | null")]
    pub diff: Option<Value>,
    pub request_id: String,
    pub timestamp: String,
}

impl From<AuditRecord> for AuditRecordResponse {
    fn from(value: AuditRecord) -> Self {
        Self {
            id: value.id().to_owned(),
            entity: value.entity().to_owned(),
            entity_id: value.entity_id().to_owned(),
            action: value.action().as_str().to_owned(),
            actor_id: value.actor_id().to_owned(),
            diff: value.diff().map(DiffPayload::to_value),
            request_id: value.request_id().to_owned(),
            timestamp: value
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// One page of audit records.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-page-response.ts"
)]
pub struct AuditPageResponse {
    pub data: Vec<AuditRecordResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub next_cursor: Option<String>,
}

impl From<AuditPage> for AuditPageResponse {
    fn from(value: AuditPage) -> Self {
        Self {
            data: value
                .data
                .into_iter()
                .map(AuditRecordResponse::from)
                .collect(),
            next_cursor: value.next_cursor,
        }
    }
}
