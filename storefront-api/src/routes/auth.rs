/// Local authentication endpoints
///
/// Sessions live in two `HttpOnly` cookies, `access_token` and
/// `refresh_token`; bodies only ever carry a message.
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create a local account and open a session
/// - `POST /v1/auth/signin` - Open a session with email and password
/// - `POST /v1/auth/refresh` - Exchange the refresh cookie for a new access token
/// - `POST /v1/auth/signout` - End the session and clear both cookies

use crate::{
    app::AppState,
    cookies::{cleared_session_cookies, read_cookie, refreshed_cookies, session_cookies, REFRESH_TOKEN_COOKIE},
    error::ApiResult,
    extractors::{AppJson, RequestMetadata},
    routes::{redirect, MessageResponse},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use storefront_shared::{
    error::AppError,
    services::auth::{SignInRequest, SignOutOutcome, SignUpRequest},
};
use tracing::info;

/// Create a local account
///
/// ```text
/// POST /v1/auth/signup
///
/// { "name": "Jane", "email": "jane@example.com", "password": "correct horse" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: name, email or password out of bounds
/// - `409 Conflict`: name or email already in use
pub async fn sign_up(
    State(state): State<AppState>,
    meta: RequestMetadata,
    AppJson(req): AppJson<SignUpRequest>,
) -> ApiResult<(StatusCode, HeaderMap, Json<MessageResponse>)> {
    let session = state.services.auth_service().sign_up(req).await?;
    let cookies = session_cookies(&session.tokens, state.secure_cookies())?;

    info!(
        user_id = %session.user_id,
        client_ip = meta.client_ip.as_deref().unwrap_or("unknown"),
        user_agent = meta.user_agent.as_deref().unwrap_or(""),
        "User signed up"
    );

    Ok((
        StatusCode::CREATED,
        cookies,
        Json(MessageResponse::new("Sign up successful")),
    ))
}

/// Sign in with email and password
///
/// Google-only accounts have no password and always get `401`.
pub async fn sign_in(
    State(state): State<AppState>,
    meta: RequestMetadata,
    AppJson(req): AppJson<SignInRequest>,
) -> ApiResult<(HeaderMap, Json<MessageResponse>)> {
    let session = state.services.auth_service().sign_in(req).await?;
    let cookies = session_cookies(&session.tokens, state.secure_cookies())?;

    info!(
        user_id = %session.user_id,
        role = session.role.as_str(),
        client_ip = meta.client_ip.as_deref().unwrap_or("unknown"),
        user_agent = meta.user_agent.as_deref().unwrap_or(""),
        "User signed in"
    );

    Ok((cookies, Json(MessageResponse::new("Sign in successful"))))
}

/// Issue a new access token from the refresh cookie
///
/// Local sessions also get a new refresh token; Google sessions keep the
/// cookie they have.
///
/// # Errors
///
/// - `401 Unauthorized`: cookie missing, invalid, expired, or no live session
pub async fn refresh(
    State(state): State<AppState>,
    meta: RequestMetadata,
    headers: HeaderMap,
) -> ApiResult<(HeaderMap, Json<MessageResponse>)> {
    let token = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .ok_or_else(|| AppError::InvalidToken("missing refresh token".to_string()))?;

    let outcome = state.services.auth_service().refresh(&token).await?;
    let cookies = refreshed_cookies(
        &outcome.access,
        outcome.refresh.as_ref(),
        state.secure_cookies(),
    )?;

    info!(
        user_id = %outcome.user_id,
        rotated = outcome.refresh.is_some(),
        client_ip = meta.client_ip.as_deref().unwrap_or("unknown"),
        "Session refreshed"
    );

    Ok((cookies, Json(MessageResponse::new("Token refreshed"))))
}

/// End the session
///
/// Both cookies are always cleared. Google sessions answer `302` to
/// Google's revoke endpoint so the browser drops the grant too.
pub async fn sign_out(
    State(state): State<AppState>,
    meta: RequestMetadata,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = read_cookie(&headers, REFRESH_TOKEN_COOKIE);
    let outcome = state
        .services
        .auth_service()
        .sign_out(token.as_deref())
        .await?;
    let cookies = cleared_session_cookies(state.secure_cookies())?;

    let session = match &outcome {
        SignOutOutcome::Local => "local",
        SignOutOutcome::Google { .. } => "google",
        SignOutOutcome::NoSession => "none",
    };
    info!(
        session,
        client_ip = meta.client_ip.as_deref().unwrap_or("unknown"),
        user_agent = meta.user_agent.as_deref().unwrap_or(""),
        "User signed out"
    );

    match outcome {
        SignOutOutcome::Google { revoke_url } => redirect(&revoke_url, cookies),
        SignOutOutcome::Local | SignOutOutcome::NoSession => {
            Ok((cookies, Json(MessageResponse::new("Sign out successful"))).into_response())
        }
    }
}
