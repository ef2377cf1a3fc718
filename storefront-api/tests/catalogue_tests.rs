/// Category and product endpoints through the full router

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_shared::models::{Role, User};
use uuid::Uuid;

async fn create_category(app: &mut TestApp, admin: &User, name: &str) -> Uuid {
    let response = app
        .request(
            Method::POST,
            "/v1/categories",
            &[app.bearer(admin)],
            Some(json!({ "name": name, "description": "Electronic devices" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body["id"].as_str().unwrap().parse().unwrap()
}

async fn create_product(
    app: &mut TestApp,
    admin: &User,
    body: Value,
) -> Uuid {
    let response = app
        .request(Method::POST, "/v1/products", &[app.bearer(admin)], Some(body))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_category_lifecycle() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);

    let id = create_category(&mut app, &admin, "Electronics").await;

    let response = app.request(Method::GET, "/v1/categories", &[], None).await;
    assert_eq!(response.status, StatusCode::OK);
    let categories = response.body.as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["name"], "Electronics");
    assert_eq!(categories[0]["description"], "Electronic devices");

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/categories/{}", id),
            &[app.bearer(&admin)],
            Some(json!({ "name": "Gadgets" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["message"].is_string());

    let response = app
        .request(Method::GET, &format!("/v1/categories/{}", id), &[], None)
        .await;
    assert_eq!(response.body["name"], "Gadgets");
    assert!(response.body["description"].is_null());

    let response = app
        .request(
            Method::DELETE,
            &format!("/v1/categories/{}", id),
            &[app.bearer(&admin)],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/v1/categories/{}", id), &[], None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "category_not_found");
}

#[tokio::test]
async fn test_category_writes_need_admin() {
    let mut app = TestApp::new();
    let user = app.seed_user(Role::User);
    let body = json!({ "name": "Books" });

    let response = app
        .request(Method::POST, "/v1/categories", &[], Some(body.clone()))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "invalid_token");

    let response = app
        .request(Method::POST, "/v1/categories", &[app.bearer(&user)], Some(body))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "unauthorized_user");

    assert!(app.store.calls().is_empty());
}

#[tokio::test]
async fn test_category_validation_skips_the_store() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);

    let response = app
        .request(
            Method::POST,
            "/v1/categories",
            &[app.bearer(&admin)],
            Some(json!({ "name": "n".repeat(101) })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "invalid_request");
    assert!(app.store.calls().is_empty());
}

#[tokio::test]
async fn test_bad_path_and_missing_rows() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);

    let response = app
        .request(Method::GET, "/v1/categories/not-a-uuid", &[], None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "invalid_request");

    let response = app
        .request(
            Method::DELETE,
            &format!("/v1/products/{}", Uuid::new_v4()),
            &[app.bearer(&admin)],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "product_not_found");
    assert_eq!(app.store.call_count("rollback"), 1);
}

#[tokio::test]
async fn test_commit_failure_is_a_server_error() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);
    app.store.fail_commit();

    let response = app
        .request(
            Method::POST,
            "/v1/categories",
            &[app.bearer(&admin)],
            Some(json!({ "name": "Books" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.code(), "commit_error");
    assert_eq!(
        response.body["error"],
        "Something went wrong, please try again later"
    );
    assert_eq!(app.store.call_count("rollback"), 1);
}

#[tokio::test]
async fn test_unconfigured_store_reports_transaction_error() {
    let mut router = TestApp::unconfigured();

    let response = common::send(
        &mut router,
        axum::http::Request::builder()
            .uri("/v1/categories")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.code(), "transaction_error");
}

#[tokio::test]
async fn test_product_visibility_by_role() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);
    let customer = app.seed_user(Role::User);
    let category = create_category(&mut app, &admin, "Lighting").await;

    let visible = create_product(
        &mut app,
        &admin,
        json!({ "category_id": category, "name": "Desk lamp", "price": "19.99", "stock": 5 }),
    )
    .await;
    let hidden = create_product(
        &mut app,
        &admin,
        json!({
            "category_id": category,
            "name": "Prototype lamp",
            "price": "99.00",
            "stock": 1,
            "is_active": false
        }),
    )
    .await;

    app.store.clear_calls();
    let response = app.request(Method::GET, "/v1/products", &[], None).await;
    assert_eq!(response.status, StatusCode::OK);
    let products = response.body.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], visible.to_string());
    assert_eq!(products[0]["price"], "19.99");
    assert_eq!(app.store.calls(), vec!["list_active_products"]);

    let response = app
        .request(Method::GET, "/v1/products", &[app.bearer(&customer)], None)
        .await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    app.store.clear_calls();
    let response = app
        .request(Method::GET, "/v1/products", &[app.bearer(&admin)], None)
        .await;
    assert_eq!(response.body.as_array().unwrap().len(), 2);
    assert_eq!(app.store.calls(), vec!["list_products"]);

    let response = app
        .request(Method::GET, &format!("/v1/products/{}", hidden), &[], None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "product_not_found");

    let response = app
        .request(
            Method::GET,
            &format!("/v1/products/{}", hidden),
            &[app.bearer(&admin)],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["is_active"], false);
}

#[tokio::test]
async fn test_invalid_token_on_public_route_is_anonymous() {
    let mut app = TestApp::new();

    let response = app
        .request(
            Method::GET,
            "/v1/products",
            &[(axum::http::header::AUTHORIZATION, "Bearer junk".to_string())],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.store.calls(), vec!["list_active_products"]);
}

#[tokio::test]
async fn test_product_filter() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);
    let lighting = create_category(&mut app, &admin, "Lighting").await;
    let books = create_category(&mut app, &admin, "Books").await;

    create_product(
        &mut app,
        &admin,
        json!({ "category_id": lighting, "name": "Desk Lamp", "price": "19.99", "stock": 5 }),
    )
    .await;
    create_product(
        &mut app,
        &admin,
        json!({ "category_id": lighting, "name": "Floor lamp", "price": "89.50", "stock": 0 }),
    )
    .await;
    create_product(
        &mut app,
        &admin,
        json!({ "category_id": books, "name": "Lamp repair manual", "price": "12.00", "stock": 3 }),
    )
    .await;

    let names = |body: &Value| -> Vec<String> {
        let mut names: Vec<String> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    };

    let response = app
        .request(
            Method::GET,
            &format!("/v1/products/filter?category_id={}", lighting),
            &[],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(names(&response.body), vec!["Desk Lamp", "Floor lamp"]);

    let response = app
        .request(Method::GET, "/v1/products/filter?search=LAMP&in_stock=true", &[], None)
        .await;
    assert_eq!(names(&response.body), vec!["Desk Lamp", "Lamp repair manual"]);

    let response = app
        .request(
            Method::GET,
            "/v1/products/filter?min_price=15&max_price=50",
            &[],
            None,
        )
        .await;
    assert_eq!(names(&response.body), vec!["Desk Lamp"]);

    let response = app
        .request(Method::GET, "/v1/products/filter?in_stock=maybe", &[], None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "invalid_request");
}

#[tokio::test]
async fn test_product_update_replaces_fields() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);
    let category = create_category(&mut app, &admin, "Lighting").await;
    let id = create_product(
        &mut app,
        &admin,
        json!({
            "category_id": category,
            "name": "Desk lamp",
            "description": "Warm light",
            "price": "19.99",
            "stock": 5
        }),
    )
    .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/products/{}", id),
            &[app.bearer(&admin)],
            Some(json!({ "category_id": category, "name": "Desk lamp v2", "price": "24.5", "stock": 2 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let product = app.store.product(id).unwrap();
    assert_eq!(product.name, "Desk lamp v2");
    assert_eq!(product.description, None);
    assert_eq!(product.price, Decimal::new(2450, 2));
    assert_eq!(product.stock, 2);

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/products/{}", id),
            &[app.bearer(&admin)],
            Some(json!({ "category_id": category, "name": "Desk lamp", "price": "-1", "stock": 2 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_with_unknown_category() {
    let mut app = TestApp::new();
    let admin = app.seed_user(Role::Admin);
    let missing = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/v1/products",
            &[app.bearer(&admin)],
            Some(json!({ "category_id": missing, "name": "Orphan", "price": "5.00", "stock": 1 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "category_not_found");
    assert_eq!(app.store.call_count("commit"), 0);

    let category = create_category(&mut app, &admin, "Lighting").await;
    let id = create_product(
        &mut app,
        &admin,
        json!({ "category_id": category, "name": "Desk lamp", "price": "19.99", "stock": 5 }),
    )
    .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/v1/products/{}", id),
            &[app.bearer(&admin)],
            Some(json!({ "category_id": missing, "name": "Desk lamp", "price": "19.99", "stock": 5 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "category_not_found");
    assert_eq!(app.store.product(id).unwrap().category_id, category);
}
