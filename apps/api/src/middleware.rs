use axum::Extension;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ledgerline_core::{ActorRole, AppError, AppResult, RequestContext};
use tracing::warn;
use uuid::Uuid;

use crate::auth::API_KEY_HEADER;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the request correlation id, echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authenticates the caller and runs the rest of the request inside its
/// [`RequestContext`].
pub async fn request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = request_id_from(request.headers());

    let authenticated = authenticate(&state, request.headers(), request_id.as_str()).await;
    let mut response = match authenticated {
        Ok(context) => {
            request.extensions_mut().insert(context.clone());
            context.scope(next.run(request)).await
        }
        Err(error) => {
            warn!(request_id = request_id.as_str(), %error, "request rejected");
            ApiError::from(error).into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Rejects callers whose role does not satisfy the route's required role.
pub async fn require_role(
    State(required): State<ActorRole>,
    Extension(context): Extension<RequestContext>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    context.require_role(required)?;
    Ok(next.run(request).await)
}

fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
) -> AppResult<RequestContext> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("API key is required".to_owned()))?;

    let principal = state
        .user_directory
        .authenticate(api_key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid API key".to_owned()))?;

    Ok(RequestContext::new(
        request_id,
        principal.actor_id,
        principal.role,
    ))
}
