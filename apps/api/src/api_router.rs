use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use ledgerline_core::ActorRole;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

use cors::build_cors_layer;

pub fn build_router(app_state: AppState) -> Router {
    let book_routes = Router::new()
        .route(
            "/api/books",
            get(handlers::books::list_books_handler).post(handlers::books::create_book_handler),
        )
        .route(
            "/api/books/{book_id}",
            get(handlers::books::get_book_handler)
                .put(handlers::books::update_book_handler)
                .delete(handlers::books::delete_book_handler),
        )
        .route_layer(from_fn_with_state(
            ActorRole::Reviewer,
            middleware::require_role,
        ));

    let audit_routes = Router::new()
        .route("/api/audits", get(handlers::audits::list_audits_handler))
        .route(
            "/api/audits/{audit_id}",
            get(handlers::audits::get_audit_handler),
        )
        .route_layer(from_fn_with_state(
            ActorRole::Admin,
            middleware::require_role,
        ));

    let api_routes = Router::new()
        .merge(book_routes)
        .merge(audit_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::request_context,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(app_state)
}

#[cfg(test)]
mod tests;
