/// Store port: typed accessors over the storefront's SQL
///
/// Each domain gets one read trait (called on the pool, outside any
/// transaction) and one write trait implemented by an open transaction.
/// Services only ever see these traits, so the PostgreSQL store and the
/// in-memory store are interchangeable.
///
/// # Transactions
///
/// `begin_*` hands out a boxed transaction. Writes go through it, then the
/// caller commits. `rollback` is idempotent: calling it after a commit (or
/// twice) is a no-op, so services call it on every error path without
/// tracking state. Dropping an unfinished transaction also rolls back.
///
/// # Example
///
/// ```no_run
/// use storefront_shared::models::CategoryInput;
/// use storefront_shared::store::{postgres::PgStore, CategoryStore, CategoryTx, Transaction};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgStore::new(pool);
/// let mut tx = store.begin_category().await?;
/// let id = tx
///     .insert_category(&CategoryInput {
///         name: "Books".to_string(),
///         description: None,
///     })
///     .await?;
/// tx.commit().await?;
/// println!("created {}", id);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Category, CategoryInput, NewUser, Product, ProductFilter, ProductInput, Provider, Role,
    UpdateProfile, User,
};

pub mod memory;
pub mod postgres;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Foreign key from `products.category_id` to `categories.id`
pub const PRODUCT_CATEGORY_FKEY: &str = "products_category_id_fkey";

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A row references, or is referenced by, a row that does not agree
    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// The transaction was already committed or rolled back
    #[error("transaction is no longer active")]
    TransactionClosed,

    /// Backend failure without a driver error (used by the in-memory store)
    #[error("store failure: {0}")]
    Backend(String),

    /// Driver error
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return StoreError::UniqueViolation { constraint },
                Some(FOREIGN_KEY_VIOLATION) => {
                    return StoreError::ForeignKeyViolation { constraint }
                }
                _ => {}
            }
        }
        StoreError::Sqlx(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Commit / rollback half of every domain transaction
#[async_trait]
pub trait Transaction: Send {
    async fn commit(&mut self) -> StoreResult<()>;

    /// No-op when the transaction is already finished
    async fn rollback(&mut self) -> StoreResult<()>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn begin_category(&self) -> StoreResult<Box<dyn CategoryTx>>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
}

#[async_trait]
pub trait CategoryTx: Transaction {
    async fn insert_category(&mut self, input: &CategoryInput) -> StoreResult<Uuid>;

    /// Returns false when no row has that id
    async fn update_category(&mut self, id: Uuid, input: &CategoryInput) -> StoreResult<bool>;

    /// Returns false when no row has that id
    async fn delete_category(&mut self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn begin_product(&self) -> StoreResult<Box<dyn ProductTx>>;

    /// Every product, active or not
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Only `is_active = true`
    async fn list_active_products(&self) -> StoreResult<Vec<Product>>;

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        active_only: bool,
    ) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait ProductTx: Transaction {
    async fn insert_product(&mut self, input: &ProductInput) -> StoreResult<Uuid>;

    async fn update_product(&mut self, id: Uuid, input: &ProductInput) -> StoreResult<bool>;

    async fn delete_product(&mut self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin_user(&self) -> StoreResult<Box<dyn UserTx>>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn user_name_exists(&self, name: &str) -> StoreResult<bool>;

    async fn user_email_exists(&self, email: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserTx: Transaction {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;

    async fn update_profile(&mut self, id: Uuid, changes: &UpdateProfile) -> StoreResult<bool>;

    async fn set_role(&mut self, id: Uuid, role: Role) -> StoreResult<bool>;

    /// Stamps `last_sign_in_at` and the provider used
    async fn record_sign_in(
        &mut self,
        id: Uuid,
        provider: Provider,
        provider_id: Option<&str>,
    ) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::UniqueViolation {
            constraint: "users_email_key".to_string(),
        };
        assert_eq!(err.to_string(), "unique constraint violated: users_email_key");

        let err = StoreError::ForeignKeyViolation {
            constraint: PRODUCT_CATEGORY_FKEY.to_string(),
        };
        assert_eq!(
            err.to_string(),
            "foreign key constraint violated: products_category_id_fkey"
        );

        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Sqlx(sqlx::Error::RowNotFound)));
    }
}
