/// Health, profile, role management and payment intents through the full
/// router

mod common;

use axum::http::{header, Method, StatusCode};
use common::TestApp;
use serde_json::json;
use storefront_shared::models::Role;
use uuid::Uuid;

#[tokio::test]
async fn test_health_without_database() {
    let mut app = TestApp::new();

    let response = app.request(Method::GET, "/health", &[], None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "degraded");
    assert_eq!(response.body["database"], "not_configured");
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let mut app = TestApp::new();

    let response = app.request(Method::GET, "/health", &[], None).await;
    assert_eq!(response.headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(response.headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert!(response.headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
}

#[tokio::test]
async fn test_profile_requires_token() {
    let mut app = TestApp::new();

    let response = app.request(Method::GET, "/v1/users", &[], None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "invalid_token");

    let response = app
        .request(
            Method::GET,
            "/v1/users/",
            &[(header::AUTHORIZATION, "Bearer not.a.jwt".to_string())],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_read_and_update() {
    let mut app = TestApp::new();
    let user = app.seed_user(Role::User);

    let response = app
        .request(Method::GET, "/v1/users/", &[app.bearer(&user)], None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], user.id.to_string());
    assert_eq!(response.body["email"], user.email);
    assert!(response.body.get("password_hash").is_none());

    let response = app
        .request(
            Method::PUT,
            "/v1/users/",
            &[app.bearer(&user)],
            Some(json!({ "phone": "+1 555 0100", "address": "1 Main St" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let stored = app.store.user(user.id).unwrap();
    assert_eq!(stored.phone.as_deref(), Some("+1 555 0100"));
    assert_eq!(stored.address.as_deref(), Some("1 Main St"));
    assert_eq!(stored.name, user.name);

    let response = app
        .request(Method::PUT, "/v1/users", &[app.bearer(&user)], Some(json!({})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "invalid_request");
}

#[tokio::test]
async fn test_profile_of_deleted_user() {
    let mut app = TestApp::new();
    let ghost = storefront_shared::models::User {
        id: Uuid::new_v4(),
        ..app.seed_user(Role::User)
    };

    let response = app
        .request(Method::GET, "/v1/users/", &[app.bearer(&ghost)], None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "user_not_found");
}

#[tokio::test]
async fn test_promote() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);
    let customer = app.seed_user(Role::User);

    let response = app
        .request(
            Method::POST,
            "/v1/admin/user/promote",
            &[app.bearer(&customer)],
            Some(json!({ "user_id": admin.id })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "unauthorized_user");
    assert!(app.store.calls().is_empty());

    let response = app
        .request(
            Method::POST,
            "/v1/admin/user/promote",
            &[app.bearer(&admin)],
            Some(json!({ "user_id": customer.id })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.store.user(customer.id).unwrap().role, Role::Admin);

    app.store.clear_calls();
    let response = app
        .request(
            Method::POST,
            "/v1/admin/user/promote",
            &[app.bearer(&admin)],
            Some(json!({ "user_id": customer.id })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "already_admin");
    assert_eq!(app.store.calls(), vec!["find_user"]);

    let response = app
        .request(
            Method::POST,
            "/v1/admin/user/promote",
            &[app.bearer(&admin)],
            Some(json!({ "user_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "user_not_found");
}

#[tokio::test]
async fn test_payment_intents() {
    let mut app = TestApp::new();
    let buyer = app.seed_user(Role::User);
    let stranger = app.seed_user(Role::User);

    let response = app
        .request(
            Method::POST,
            "/v1/payments/intents",
            &[app.bearer(&buyer)],
            Some(json!({ "amount": 1999, "currency": "USD" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["amount"], 1999);
    assert_eq!(response.body["currency"], "usd");
    assert!(response.body["client_secret"].is_string());
    assert!(response.body.get("user_id").is_none());
    let id = response.body["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::GET,
            &format!("/v1/payments/intents/{}", id),
            &[app.bearer(&buyer)],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);

    let response = app
        .request(
            Method::GET,
            &format!("/v1/payments/intents/{}", id),
            &[app.bearer(&stranger)],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "payment_intent_not_found");

    let response = app
        .request(
            Method::POST,
            "/v1/payments/intents",
            &[app.bearer(&buyer)],
            Some(json!({ "amount": 10 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "invalid_request");

    let response = app
        .request(
            Method::POST,
            "/v1/payments/intents",
            &[],
            Some(json!({ "amount": 1999 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
