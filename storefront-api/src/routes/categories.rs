/// Category endpoints
///
/// Reads are public; writes need an admin access token.

use crate::{
    app::AppState,
    error::ApiResult,
    extractors::{AdminUser, AppJson, AppPath},
    routes::{CreatedResponse, MessageResponse},
};
use axum::{extract::State, http::StatusCode, Json};
use storefront_shared::models::{Category, CategoryInput};
use tracing::info;
use uuid::Uuid;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let categories = state.services.category_service().get_all().await?;
    Ok(Json(categories))
}

pub async fn get(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Category>> {
    let category = state.services.category_service().get_by_id(id).await?;
    Ok(Json(category))
}

/// ```text
/// POST /v1/categories
///
/// { "name": "Electronics", "description": "Electronic devices" }
/// ```
///
/// Answers `201` with `{"message": "...", "id": "<uuid>"}`.
pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(input): AppJson<CategoryInput>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.services.category_service().create(input).await?;
    info!(category_id = %id, admin_id = %admin.id, "Category created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Category created".to_string(),
            id,
        }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<CategoryInput>,
) -> ApiResult<Json<MessageResponse>> {
    state.services.category_service().update(id, input).await?;
    info!(category_id = %id, admin_id = %admin.id, "Category updated");
    Ok(Json(MessageResponse::new("Category updated")))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.services.category_service().delete(id).await?;
    info!(category_id = %id, admin_id = %admin.id, "Category deleted");
    Ok(Json(MessageResponse::new("Category deleted")))
}
