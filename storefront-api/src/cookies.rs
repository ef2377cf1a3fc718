/// Session cookies
///
/// Both tokens travel as `HttpOnly; SameSite=Lax` cookies on `/`, with
/// `Secure` added in production. Expiry mirrors the token's own `exp`.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use storefront_shared::auth::jwt::{IssuedToken, TokenPair};

use crate::error::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` value for a token
pub fn token_cookie(name: &str, token: &IssuedToken, secure: bool) -> String {
    let max_age = (token.expires_at - Utc::now()).num_seconds().max(0);
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}; Expires={}{}",
        name,
        token.token,
        max_age,
        http_date(token.expires_at),
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that deletes the cookie
pub fn cleared_cookie(name: &str, secure: bool) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires={}{}",
        name,
        EPOCH_HTTP_DATE,
        if secure { "; Secure" } else { "" }
    )
}

fn append(headers: &mut HeaderMap, cookie: String) -> Result<(), ApiError> {
    let value = HeaderValue::try_from(cookie)
        .map_err(|e| ApiError::Internal(format!("invalid cookie value: {}", e)))?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

/// Sets both session cookies
pub fn session_cookies(tokens: &TokenPair, secure: bool) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    append(&mut headers, token_cookie(ACCESS_TOKEN_COOKIE, &tokens.access, secure))?;
    append(&mut headers, token_cookie(REFRESH_TOKEN_COOKIE, &tokens.refresh, secure))?;
    Ok(headers)
}

/// Sets the access cookie, and the refresh cookie only when it changed
pub fn refreshed_cookies(
    access: &IssuedToken,
    refresh: Option<&IssuedToken>,
    secure: bool,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    append(&mut headers, token_cookie(ACCESS_TOKEN_COOKIE, access, secure))?;
    if let Some(refresh) = refresh {
        append(&mut headers, token_cookie(REFRESH_TOKEN_COOKIE, refresh, secure))?;
    }
    Ok(headers)
}

/// Clears both session cookies
pub fn cleared_session_cookies(secure: bool) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    append(&mut headers, cleared_cookie(ACCESS_TOKEN_COOKIE, secure))?;
    append(&mut headers, cleared_cookie(REFRESH_TOKEN_COOKIE, secure))?;
    Ok(headers)
}

/// Reads a cookie from every `Cookie` header on the request
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
