/// Application error type shared by every service
///
/// `AppError` is closed: each variant has one machine-readable code
/// (`code()`) and a human message (`Display`). Infrastructure variants wrap
/// their cause so the HTTP layer can log it while answering with a generic
/// message.

use std::fmt;

use crate::auth::jwt::JwtError;
use crate::auth::oauth::OAuthError;
use crate::auth::password::PasswordError;
use crate::cache::CacheError;
use crate::payments::PaymentError;
use crate::store::StoreError;

/// Entities that can be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Product,
    User,
    PaymentIntent,
}

impl Entity {
    pub fn not_found_code(&self) -> &'static str {
        match self {
            Entity::Category => "category_not_found",
            Entity::Product => "product_not_found",
            Entity::User => "user_not_found",
            Entity::PaymentIntent => "payment_intent_not_found",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Entity::Category => "category",
            Entity::Product => "product",
            Entity::User => "user",
            Entity::PaymentIntent => "payment intent",
        }
    }
}

/// Optional collaborators a service may be built without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Database,
    Cache,
    OAuthProvider,
    PaymentProvider,
    TokenIssuer,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dependency::Database => "database",
            Dependency::Cache => "cache",
            Dependency::OAuthProvider => "OAuth provider",
            Dependency::PaymentProvider => "payment provider",
            Dependency::TokenIssuer => "token issuer",
        };
        f.write_str(name)
    }
}

/// Store writes with their own failure code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    UpdateProfile,
    PromoteUser,
    CreateUser,
    RecordSignIn,
}

impl Operation {
    pub fn code(&self) -> &'static str {
        match self {
            Operation::CreateCategory => "create_category_error",
            Operation::UpdateCategory => "update_category_error",
            Operation::DeleteCategory => "delete_category_error",
            Operation::CreateProduct => "create_product_error",
            Operation::UpdateProduct => "update_product_error",
            Operation::DeleteProduct => "delete_product_error",
            Operation::UpdateProfile => "update_failed",
            Operation::PromoteUser => "promote_user_error",
            Operation::CreateUser => "create_user_error",
            Operation::RecordSignIn => "sign_in_error",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateCategory => "create category",
            Operation::UpdateCategory => "update category",
            Operation::DeleteCategory => "delete category",
            Operation::CreateProduct => "create product",
            Operation::UpdateProduct => "update product",
            Operation::DeleteProduct => "delete product",
            Operation::UpdateProfile => "update profile",
            Operation::PromoteUser => "promote user",
            Operation::CreateUser => "create user",
            Operation::RecordSignIn => "record sign-in",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{} not found", .0.label())]
    NotFound(Entity),

    #[error("name already exists")]
    NameTaken,

    #[error("email already exists")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid oauth state")]
    InvalidOAuthState,

    #[error("user is not allowed to perform this action")]
    UnauthorizedUser,

    #[error("user is already an admin")]
    AlreadyAdmin,

    #[error("{0} is not configured")]
    NotConfigured(Dependency),

    #[error("failed to begin transaction: {0}")]
    Transaction(#[source] StoreError),

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] StoreError),

    #[error("database query failed: {0}")]
    Database(#[source] StoreError),

    #[error("{op} failed: {source}")]
    Operation {
        op: Operation,
        #[source]
        source: StoreError,
    },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("token error: {0}")]
    Token(#[from] JwtError),

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("oauth provider error: {0}")]
    Provider(#[from] OAuthError),

    #[error("payment provider error: {0}")]
    Payment(#[from] PaymentError),
}

impl AppError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::NotFound(entity) => entity.not_found_code(),
            AppError::NameTaken => "name_already_exists",
            AppError::EmailTaken => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::InvalidOAuthState => "invalid_oauth_state",
            AppError::UnauthorizedUser => "unauthorized_user",
            AppError::AlreadyAdmin => "already_admin",
            AppError::NotConfigured(Dependency::Database) => "transaction_error",
            AppError::NotConfigured(_) => "not_configured",
            AppError::Transaction(_) => "transaction_error",
            AppError::Commit(_) => "commit_error",
            AppError::Database(_) => "database_error",
            AppError::Operation { op, .. } => op.code(),
            AppError::Cache(_) => "cache_error",
            AppError::Token(_) => "token_error",
            AppError::Password(_) => "password_error",
            AppError::Provider(_) => "oauth_provider_error",
            AppError::Payment(_) => "payment_provider_error",
        }
    }

    pub fn operation(op: Operation) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Operation { op, source }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidRequest(validation_message(&errors))
    }
}

/// First field message, e.g. "name must be between 1 and 100 characters"
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    for (field, errs) in fields {
        if let Some(e) = errs.first() {
            return match e.message {
                Some(ref message) => message.to_string(),
                None => format!("{} is invalid", field),
            };
        }
    }
    "invalid request".to_string()
}

pub type AppResult<T> = Result<T, AppError>;
