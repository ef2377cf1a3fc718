/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; domain errors convert through
/// `From<AppError>` and are mapped to a status here, exhaustively.
///
/// Every error body has the same shape:
///
/// ```json
/// { "error": "category not found", "code": "category_not_found" }
/// ```
///
/// 5xx answers never carry the real cause; it is logged instead.
///
/// # Example
///
/// ```
/// use storefront_api::error::{ApiError, ApiResult};
/// use storefront_shared::error::{AppError, Entity};
///
/// fn lookup(found: bool) -> ApiResult<&'static str> {
///     if !found {
///         return Err(AppError::NotFound(Entity::Product).into());
///     }
///     Ok("lamp")
/// }
///
/// assert_eq!(lookup(false).unwrap_err().status().as_u16(), 404);
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use storefront_shared::error::AppError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Text sent for every 5xx answer
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong, please try again later";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Domain error from a service
    #[error("{0}")]
    App(#[from] AppError),

    /// Failure in the HTTP layer itself (e.g. an unencodable header)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Machine-readable code (e.g. "invalid_request", "user_not_found")
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::App(err) => app_status(err),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::App(err) => err.code(),
            ApiError::Internal(_) => "internal_error",
        }
    }
}

fn app_status(err: &AppError) -> StatusCode {
    match err {
        AppError::InvalidRequest(_) | AppError::InvalidOAuthState | AppError::AlreadyAdmin => {
            StatusCode::BAD_REQUEST
        }
        AppError::InvalidCredentials | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        AppError::UnauthorizedUser => StatusCode::FORBIDDEN,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::NameTaken | AppError::EmailTaken => StatusCode::CONFLICT,
        AppError::Provider(_) | AppError::Payment(_) => StatusCode::BAD_GATEWAY,
        AppError::NotConfigured(_)
        | AppError::Transaction(_)
        | AppError::Commit(_)
        | AppError::Database(_)
        | AppError::Operation { .. }
        | AppError::Cache(_)
        | AppError::Token(_)
        | AppError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code, error = %self, "Request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            tracing::warn!(status = status.as_u16(), code, error = %self, "Request rejected");
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::App(AppError::InvalidRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::App(AppError::InvalidRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::App(AppError::InvalidRequest(rejection.body_text()))
    }
}
