/// Product endpoints
///
/// Anonymous callers and plain users only see active products; an admin
/// token shows everything. Writes need an admin token.
///
/// # Endpoints
///
/// - `GET /v1/products` - List
/// - `GET /v1/products/filter?category_id=&min_price=&max_price=&search=&in_stock=` - Search
/// - `GET /v1/products/:id` - Fetch one
/// - `POST /v1/products` - Create (admin)
/// - `PUT /v1/products/:id` - Replace (admin)
/// - `DELETE /v1/products/:id` - Delete (admin)

use crate::{
    app::AppState,
    error::ApiResult,
    extractors::{AdminUser, AppJson, AppPath, AppQuery, OptionalUser},
    routes::{CreatedResponse, MessageResponse},
};
use axum::{extract::State, http::StatusCode, Json};
use storefront_shared::models::{Product, ProductFilter, ProductInput};
use tracing::info;
use uuid::Uuid;

pub async fn list(
    State(state): State<AppState>,
    user: OptionalUser,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .services
        .product_service()
        .get_all(user.is_admin())
        .await?;
    Ok(Json(products))
}

pub async fn filter(
    State(state): State<AppState>,
    user: OptionalUser,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .services
        .product_service()
        .filter(filter, user.is_admin())
        .await?;
    Ok(Json(products))
}

/// An inactive product is `404` for non-admins
pub async fn get(
    State(state): State<AppState>,
    user: OptionalUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Product>> {
    let product = state
        .services
        .product_service()
        .get_by_id(id, user.is_admin())
        .await?;
    Ok(Json(product))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(input): AppJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.services.product_service().create(input).await?;
    info!(product_id = %id, admin_id = %admin.id, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Product created".to_string(),
            id,
        }),
    ))
}

/// Full replacement; omitted optional fields are cleared
pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<ProductInput>,
) -> ApiResult<Json<MessageResponse>> {
    state.services.product_service().update(id, input).await?;
    info!(product_id = %id, admin_id = %admin.id, "Product updated");
    Ok(Json(MessageResponse::new("Product updated")))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.services.product_service().delete(id).await?;
    info!(product_id = %id, admin_id = %admin.id, "Product deleted");
    Ok(Json(MessageResponse::new("Product deleted")))
}
