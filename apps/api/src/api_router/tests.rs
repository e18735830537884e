use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use ledgerline_application::InvalidCursorPolicy;
use ledgerline_domain::AuditPolicyTable;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::api_services::{in_memory_app_state, provision_api_users};
use crate::auth::ApiKeyTable;
use crate::state::AppState;

const ADMIN_KEY: &str = "admin-key";
const REVIEWER_KEY: &str = "reviewer-key";

async fn test_app() -> (AppState, Router) {
    let state = in_memory_app_state(AuditPolicyTable::builtin(), InvalidCursorPolicy::Reject);
    let api_keys = ApiKeyTable::parse("admin-key:alice:admin,reviewer-key:bob:reviewer")
        .unwrap_or_default();
    assert!(provision_api_users(&state, &api_keys).await.is_ok());

    (state.clone(), build_router(state))
}

async fn test_router() -> Router {
    test_app().await.1
}

fn request(method: Method, uri: &str, api_key: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(api_key) = api_key {
        builder = builder.header("x-api-key", api_key);
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    builder
        .body(body)
        .unwrap_or_else(|_| unreachable!("test request is well formed"))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let Ok(response) = router.clone().oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, request_id, body)
}

#[tokio::test]
async fn health_needs_no_api_key() {
    let router = test_router().await;

    let (status, _, body) = send(&router, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn missing_or_unknown_keys_are_unauthorized() {
    let router = test_router().await;

    let mut anonymous = request(Method::GET, "/api/books", None, None);
    anonymous
        .headers_mut()
        .insert("x-request-id", axum::http::HeaderValue::from_static("req-anon"));
    let (missing, request_id, _) = send(&router, anonymous).await;
    let (unknown, generated_id, _) = send(
        &router,
        request(Method::GET, "/api/books", Some("nope"), None),
    )
    .await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(request_id.as_deref(), Some("req-anon"));
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert!(generated_id.is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn reviewers_cannot_read_the_audit_trail() {
    let router = test_router().await;

    let (books, _, _) = send(
        &router,
        request(Method::GET, "/api/books", Some(REVIEWER_KEY), None),
    )
    .await;
    let (audits, _, _) = send(
        &router,
        request(Method::GET, "/api/audits", Some(REVIEWER_KEY), None),
    )
    .await;

    assert_eq!(books, StatusCode::OK);
    assert_eq!(audits, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn book_mutations_land_in_the_audit_trail() {
    let router = test_router().await;

    let mut create = request(
        Method::POST,
        "/api/books",
        Some(REVIEWER_KEY),
        Some(json!({
            "title": "Refactoring",
            "authors": "Martin Fowler",
            "publishedBy": "Addison-Wesley",
        })),
    );
    create
        .headers_mut()
        .insert("x-request-id", axum::http::HeaderValue::from_static("req-create"));
    let (status, _, created) = send(&router, create).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["createdBy"], json!("bob"));
    let book_id = created["id"].as_str().unwrap_or_default().to_owned();
    assert!(!book_id.is_empty());

    let (status, _, updated) = send(
        &router,
        request(
            Method::PUT,
            format!("/api/books/{book_id}").as_str(),
            Some(REVIEWER_KEY),
            Some(json!({ "title": "Refactoring, 2nd Edition" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], json!("Refactoring, 2nd Edition"));

    let (status, _, _) = send(
        &router,
        request(
            Method::DELETE,
            format!("/api/books/{book_id}").as_str(),
            Some(REVIEWER_KEY),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, page) = send(
        &router,
        request(
            Method::GET,
            format!("/api/audits?entity=Book&entityId={book_id}").as_str(),
            Some(ADMIN_KEY),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let records = page["data"].as_array().cloned().unwrap_or_default();
    let actions: Vec<&str> = records
        .iter()
        .filter_map(|record| record["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["delete", "update", "create"]);
    assert!(records.iter().all(|record| record["actorId"] == json!("bob")));
    assert_eq!(records[2]["requestId"], json!("req-create"));
    assert_eq!(
        records[1]["diff"],
        json!({
            "title": {
                "before": "Refactoring",
                "after": "Refactoring, 2nd Edition",
            }
        })
    );

    let audit_id = records[1]["id"].as_str().unwrap_or_default();
    let (status, _, record) = send(
        &router,
        request(
            Method::GET,
            format!("/api/audits/{audit_id}").as_str(),
            Some(ADMIN_KEY),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["action"], json!("update"));
}

#[tokio::test]
async fn audit_queries_reject_bad_input() {
    let router = test_router().await;

    let (bad_cursor, _, _) = send(
        &router,
        request(Method::GET, "/api/audits?cursor=garbage", Some(ADMIN_KEY), None),
    )
    .await;
    let (bad_action, _, _) = send(
        &router,
        request(Method::GET, "/api/audits?action=archive", Some(ADMIN_KEY), None),
    )
    .await;
    let (missing, _, body) = send(
        &router,
        request(Method::GET, "/api/audits/unknown", Some(ADMIN_KEY), None),
    )
    .await;

    assert_eq!(bad_cursor, StatusCode::BAD_REQUEST);
    assert_eq!(bad_action, StatusCode::BAD_REQUEST);
    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn empty_book_updates_are_rejected() {
    let router = test_router().await;

    let (status, _, created) = send(
        &router,
        request(
            Method::POST,
            "/api/books",
            Some(ADMIN_KEY),
            Some(json!({
                "title": "Clean Code",
                "authors": "Robert C. Martin",
                "publishedBy": "Prentice Hall",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = created["id"].as_str().unwrap_or_default();

    let (status, _, _) = send(
        &router,
        request(
            Method::PUT,
            format!("/api/books/{book_id}").as_str(),
            Some(ADMIN_KEY),
            Some(json!({})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provisioned_users_are_audited_with_redacted_credentials() {
    let router = test_router().await;

    let (status, _, page) = send(
        &router,
        request(Method::GET, "/api/audits?entity=User", Some(ADMIN_KEY), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = page["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record["action"], json!("create"));
        assert_eq!(record["actorId"], json!("system"));
        assert_eq!(record["diff"]["credentials"], json!("***"));
        assert!(
            record["requestId"]
                .as_str()
                .is_some_and(|id| id.starts_with("startup-"))
        );
    }
}

#[tokio::test]
async fn rotated_keys_replace_the_stored_credential() {
    let (state, router) = test_app().await;
    let rotated = ApiKeyTable::parse("admin-key-2:alice:admin").unwrap_or_default();
    assert!(provision_api_users(&state, &rotated).await.is_ok());

    let (old_key, _, _) = send(
        &router,
        request(Method::GET, "/api/audits", Some(ADMIN_KEY), None),
    )
    .await;
    let (status, _, page) = send(
        &router,
        request(
            Method::GET,
            "/api/audits?entity=User&entityId=alice&action=update",
            Some("admin-key-2"),
            None,
        ),
    )
    .await;

    assert_eq!(old_key, StatusCode::UNAUTHORIZED);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        page["data"][0]["diff"],
        json!({ "credentials": { "before": "***", "after": "***" } })
    );
}
