/// Google OAuth endpoints
///
/// # Endpoints
///
/// - `GET /v1/auth/google/signin` - Redirect to Google's consent page
/// - `GET /v1/auth/google/callback?state=..&code=..` - Finish sign-in
///
/// The callback ends in a redirect either way: to the frontend with both
/// session cookies set, or back to Google with `prompt=consent` when no
/// Google refresh token is available for the account.

use crate::{
    app::AppState,
    cookies::session_cookies,
    error::ApiResult,
    extractors::{AppQuery, RequestMetadata},
    routes::redirect,
};
use axum::{extract::State, http::HeaderMap, response::Response};
use serde::Deserialize;
use storefront_shared::{error::AppError, services::auth::GoogleSignIn};
use tracing::info;

/// Query string Google appends to the redirect URL
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub code: String,

    /// Set instead of `code` when the user denied consent
    pub error: Option<String>,
}

pub async fn sign_in(State(state): State<AppState>) -> ApiResult<Response> {
    let url = state.services.auth_service().google_signin_url().await?;
    redirect(&url, HeaderMap::new())
}

pub async fn callback(
    State(state): State<AppState>,
    meta: RequestMetadata,
    AppQuery(query): AppQuery<CallbackQuery>,
) -> ApiResult<Response> {
    if let Some(error) = query.error {
        return Err(AppError::InvalidRequest(format!("google sign-in failed: {}", error)).into());
    }

    let outcome = state
        .services
        .auth_service()
        .google_callback(&query.state, &query.code)
        .await?;

    match outcome {
        GoogleSignIn::SignedIn(session) => {
            let cookies = session_cookies(&session.tokens, state.secure_cookies())?;
            info!(
                user_id = %session.user_id,
                role = session.role.as_str(),
                client_ip = meta.client_ip.as_deref().unwrap_or("unknown"),
                user_agent = meta.user_agent.as_deref().unwrap_or(""),
                "User signed in with Google"
            );
            redirect(&state.config.api.frontend_url, cookies)
        }
        GoogleSignIn::ConsentRequired { url } => {
            info!(
                client_ip = meta.client_ip.as_deref().unwrap_or("unknown"),
                "Google refresh token unavailable, requesting consent"
            );
            redirect(&url, HeaderMap::new())
        }
    }
}
