/// Role management
///
/// ```text
/// POST /v1/admin/user/promote
///
/// { "user_id": "<uuid>" }
/// ```
///
/// Any signed-in user may call this; the role check belongs to the user
/// service, which answers `403` for non-admins before touching the store.

use crate::{
    app::AppState,
    error::ApiResult,
    extractors::{AppJson, CurrentUser},
    routes::MessageResponse,
};
use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub user_id: Uuid,
}

pub async fn promote(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<PromoteRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .user_service()
        .promote(user.role, req.user_id)
        .await?;

    info!(user_id = %req.user_id, admin_id = %user.id, "User promoted to admin");
    Ok(Json(MessageResponse::new("User promoted to admin")))
}
