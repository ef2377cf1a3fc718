/// API route handlers, one module per resource
///
/// - `health`: liveness and database status
/// - `auth`: local sign-up / sign-in, refresh, sign-out
/// - `google`: Google OAuth sign-in and callback
/// - `categories`, `products`: catalogue CRUD
/// - `users`: the caller's own profile
/// - `admin`: role management
/// - `payments`: payment intents

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub mod admin;
pub mod auth;
pub mod categories;
pub mod google;
pub mod health;
pub mod payments;
pub mod products;
pub mod users;

/// `{"message": ...}` success body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Success body for creations
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: Uuid,
}

/// `302 Found` to `location`, carrying any extra headers (e.g. cookies)
pub(crate) fn redirect(location: &str, mut headers: HeaderMap) -> ApiResult<Response> {
    let location = HeaderValue::try_from(location)
        .map_err(|e| ApiError::Internal(format!("invalid redirect location: {}", e)))?;
    headers.insert(header::LOCATION, location);
    Ok((StatusCode::FOUND, headers).into_response())
}
