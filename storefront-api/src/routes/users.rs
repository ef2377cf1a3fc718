/// The caller's own profile
///
/// - `GET /v1/users/` - Profile of the access token's subject
/// - `PUT /v1/users/` - Change name, phone or address

use crate::{
    app::AppState,
    error::ApiResult,
    extractors::{AppJson, CurrentUser},
    routes::MessageResponse,
};
use axum::{extract::State, Json};
use storefront_shared::models::{UpdateProfile, UserProfile};
use tracing::info;

pub async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.services.user_service().get_profile(user.id).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(changes): AppJson<UpdateProfile>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .user_service()
        .update_profile(user.id, changes)
        .await?;
    info!(user_id = %user.id, "Profile updated");
    Ok(Json(MessageResponse::new("Profile updated")))
}
