//! API Integration Tests
//!
//! Most tests run the full router over an in-memory user store. Tests marked
//! with #[ignore] require PostgreSQL at DATABASE_URL; run them with
//! `cargo test -- --ignored`.

use arena_api::auth::jwt::{issue_token_at, JwtConfig};
use arena_api::auth::{AuthService, PasswordConfig};
use arena_api::{create_router, state::AppState};
use arena_core::config::AppConfig;
use arena_core::{MemoryUserStore, PgUserStore};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        expiration_secs: 3600,
        issuer: "arena-api".to_string(),
    }
}

/// Router over a fresh in-memory store, plus a handle to that store
fn create_test_app() -> (Router, Arc<MemoryUserStore>) {
    let store = Arc::new(MemoryUserStore::new());
    let auth = AuthService::new(store.clone(), jwt_config(), PasswordConfig::insecure_fast());
    let state = Arc::new(AppState::new(auth));
    (create_router(state), store)
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn me_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/me");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn credentials(username: &str, password: &str) -> Value {
    json!({ "username": username, "password": password })
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_follows_store() {
    let (app, store) = create_test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);

    store.set_unavailable(true);
    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["user_store"], false);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/register"].is_object());
    assert!(json["paths"]["/api/login"].is_object());
    assert!(json["paths"]["/api/me"].is_object());
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_success() {
    let (app, store) = create_test_app();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "s3cr3t!")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["user_id"], 1);
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 3600);
    assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let (app, store) = create_test_app();

    let first = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "first")),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "second")),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "DUPLICATE_USERNAME");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_register_empty_fields() {
    let (app, store) = create_test_app();

    for body in [credentials("", "pw"), credentials("alice", "")] {
        let response = app
            .clone()
            .oneshot(create_json_request("POST", "/api/register", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_nul_in_username_rejected_before_store() {
    let (app, store) = create_test_app();

    for uri in ["/api/register", "/api/login"] {
        let response = app
            .clone()
            .oneshot(create_json_request(
                "POST",
                uri,
                Some(credentials("ali\u{0}ce", "s3cr3t!")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_register_missing_field_rejected() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(json!({ "username": "alice" })),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_register_store_unavailable() {
    let (app, store) = create_test_app();
    store.set_unavailable(true);

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "s3cr3t!")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
    assert!(!json["message"]
        .as_str()
        .unwrap_or_default()
        .contains("connection refused"));
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let (app, _) = create_test_app();

    let registered = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "s3cr3t!")),
        ))
        .await
        .unwrap();
    let registered = body_json(registered).await;

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/login",
            Some(credentials("alice", "s3cr3t!")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user_id"], registered["user_id"]);
    assert_eq!(json["token_type"], "Bearer");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _) = create_test_app();

    app.clone()
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "s3cr3t!")),
        ))
        .await
        .unwrap();

    let wrong_password = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/login",
            Some(credentials("alice", "wrong")),
        ))
        .await
        .unwrap();
    let unknown_user = app
        .oneshot(create_json_request(
            "POST",
            "/api/login",
            Some(credentials("nobody", "s3cr3t!")),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
}

#[tokio::test]
async fn test_login_empty_fields() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/login",
            Some(credentials("", "")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Protected Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_me_with_valid_token() {
    let (app, _) = create_test_app();

    let registered = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials("alice", "s3cr3t!")),
        ))
        .await
        .unwrap();
    let registered = body_json(registered).await;
    let token = registered["token"].as_str().unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user_id"], registered["user_id"]);
}

#[tokio::test]
async fn test_me_without_token() {
    let (app, _) = create_test_app();

    let response = app.oneshot(me_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_with_malformed_header() {
    let (app, _) = create_test_app();

    for value in ["Basic dXNlcjpwdw==", "Bearer", "token-without-scheme"] {
        let response = app.clone().oneshot(me_request(Some(value))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value}");
    }
}

#[tokio::test]
async fn test_me_with_forged_token() {
    let (app, _) = create_test_app();

    let foreign = JwtConfig {
        secret: "some-other-secret".to_string(),
        ..jwt_config()
    };
    let token = issue_token_at(&foreign, 1, chrono::Utc::now().timestamp()).unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_me_with_expired_token() {
    let (app, _) = create_test_app();

    let issued_at = chrono::Utc::now().timestamp() - 2 * 3600;
    let token = issue_token_at(&jwt_config(), 1, issued_at).unwrap();

    let response = app
        .oneshot(me_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "TOKEN_EXPIRED");
}

// =============================================================================
// PostgreSQL-backed Tests
// =============================================================================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_register_login_against_postgres() {
    let config = AppConfig::from_env().unwrap();
    let store = Arc::new(PgUserStore::connect(&config.database).await.unwrap());
    let auth = AuthService::new(store.clone(), jwt_config(), PasswordConfig::insecure_fast());
    let app = create_router(Arc::new(AppState::new(auth)));

    let username = format!("it-{}", uuid::Uuid::new_v4());

    let registered = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials(&username, "s3cr3t!")),
        ))
        .await
        .unwrap();
    assert_eq!(registered.status(), StatusCode::CREATED);
    let registered = body_json(registered).await;

    let duplicate = app
        .clone()
        .oneshot(create_json_request(
            "POST",
            "/api/register",
            Some(credentials(&username, "other")),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let login = app
        .oneshot(create_json_request(
            "POST",
            "/api/login",
            Some(credentials(&username, "s3cr3t!")),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    assert_eq!(body_json(login).await["user_id"], registered["user_id"]);

    store.close().await;
}
