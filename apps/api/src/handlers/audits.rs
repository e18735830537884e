use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use ledgerline_application::AuditFilters;
use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::AuditAction;
use serde::Deserialize;

use crate::dto::{AuditPageResponse, AuditRecordResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListQuery {
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub request_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub fields_changed: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl AuditListQuery {
    fn filters(&self) -> AppResult<AuditFilters> {
        Ok(AuditFilters {
            entity: non_empty(self.entity.as_deref()),
            entity_id: non_empty(self.entity_id.as_deref()),
            actor_id: non_empty(self.actor_id.as_deref()),
            action: non_empty(self.action.as_deref())
                .map(|action| action.parse::<AuditAction>())
                .transpose()?,
            request_id: non_empty(self.request_id.as_deref()),
            from: parse_timestamp("from", self.from.as_deref())?,
            to: parse_timestamp("to", self.to.as_deref())?,
            fields_changed: self
                .fields_changed
                .as_deref()
                .map(|fields| {
                    fields
                        .split(',')
                        .map(str::trim)
                        .filter(|field| !field.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

pub async fn list_audits_handler(
    State(state): State<AppState>,
    Query(query): Query<AuditListQuery>,
) -> ApiResult<Json<AuditPageResponse>> {
    let page = state
        .audit_query_service
        .query(query.filters()?, query.cursor.as_deref(), query.limit)
        .await?;

    Ok(Json(AuditPageResponse::from(page)))
}

pub async fn get_audit_handler(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> ApiResult<Json<AuditRecordResponse>> {
    let record = state
        .audit_query_service
        .find_by_id(audit_id.as_str())
        .await?;

    Ok(Json(AuditRecordResponse::from(record)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn parse_timestamp(name: &str, value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    non_empty(value)
        .map(|value| {
            DateTime::parse_from_rfc3339(value.as_str())
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|error| {
                    AppError::Validation(format!("'{name}' must be an RFC3339 timestamp: {error}"))
                })
        })
        .transpose()
}
