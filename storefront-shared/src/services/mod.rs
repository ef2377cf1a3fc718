/// Domain services
///
/// Every service holds optional dependencies and follows one contract for
/// writes: missing store → `transaction_error`; validate; begin; one store
/// write; roll back on any failure after begin; commit (a failed commit is
/// rolled back too and reported as `commit_error`). Reads skip the
/// transaction and report query failures as `database_error`.
///
/// # Services
///
/// - [`category::CategoryService`]
/// - [`product::ProductService`]
/// - [`user::UserService`]
/// - [`auth::AuthService`]
/// - [`payment::PaymentService`]
///
/// [`registry::ServiceRegistry`] builds them on first use.

use tracing::warn;

use crate::error::{AppError, AppResult, Entity};
use crate::store::Transaction;

pub mod auth;
pub mod category;
pub mod lazy;
pub mod payment;
pub mod product;
pub mod registry;
pub mod user;

pub use auth::{AuthService, AuthSession, GoogleSignIn, RefreshOutcome, SignOutOutcome};
pub use category::CategoryService;
pub use lazy::LazyService;
pub use payment::{CreatePaymentIntent, PaymentService};
pub use product::ProductService;
pub use registry::ServiceRegistry;
pub use user::UserService;

/// Rolls back, logging instead of failing; the caller already has an error
pub(crate) async fn rollback<T: Transaction + ?Sized>(tx: &mut T) {
    if let Err(err) = tx.rollback().await {
        warn!(error = %err, "Transaction rollback failed");
    }
}

/// Rolls back when `result` is an error, then hands `result` back
pub(crate) async fn rollback_on_err<T, R>(tx: &mut T, result: AppResult<R>) -> AppResult<R>
where
    T: Transaction + ?Sized,
    R: Send,
{
    if result.is_err() {
        rollback(tx).await;
    }
    result
}

/// Commits; on failure rolls back and reports `commit_error`
pub(crate) async fn commit<T: Transaction + ?Sized>(tx: &mut T) -> AppResult<()> {
    if let Err(err) = tx.commit().await {
        rollback(tx).await;
        return Err(AppError::Commit(err));
    }
    Ok(())
}

/// Maps "zero rows affected" to the entity's not-found error
pub(crate) fn found(affected: bool, entity: Entity) -> AppResult<()> {
    if affected {
        Ok(())
    } else {
        Err(AppError::NotFound(entity))
    }
}
