use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::API_KEY_HEADER;
use crate::middleware::REQUEST_ID_HEADER;

pub(super) fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
