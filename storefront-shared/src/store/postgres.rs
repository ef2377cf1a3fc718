/// PostgreSQL implementation of the store traits
///
/// `PgStore` runs reads straight on the pool; `begin_*` opens a
/// `sqlx::Transaction` wrapped in [`PgTx`], which implements every domain's
/// write trait. Queries are runtime-checked `sqlx::query_as` calls so the
/// crate builds without a live database.

use async_trait::async_trait;
use sqlx::{postgres::PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{
    CategoryStore, CategoryTx, ProductStore, ProductTx, StoreError, StoreResult, Transaction,
    UserStore, UserTx,
};
use crate::models::{
    Category, CategoryInput, NewUser, Product, ProductFilter, ProductInput, Provider, Role,
    UpdateProfile, User,
};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price, stock, image_url, \
                               is_active, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, provider, provider_id, phone, \
                            address, role, created_at, updated_at, last_sign_in_at";

/// Pool-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> StoreResult<PgTx> {
        let tx = self.pool.begin().await?;
        debug!("Transaction started");
        Ok(PgTx { inner: Some(tx) })
    }
}

/// Open transaction
///
/// `inner` is taken on commit or rollback; afterwards every write fails with
/// [`StoreError::TransactionClosed`] and rollback does nothing.
pub struct PgTx {
    inner: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.inner
            .as_deref_mut()
            .ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.inner.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.rollback().await?;
            debug!("Transaction rolled back");
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn begin_category(&self) -> StoreResult<Box<dyn CategoryTx>> {
        Ok(Box::new(self.begin().await?))
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }
}

#[async_trait]
impl CategoryTx for PgTx {
    async fn insert_category(&mut self, input: &CategoryInput) -> StoreResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(self.conn()?)
        .await?;

        Ok(id)
    }

    async fn update_category(&mut self, id: Uuid, input: &CategoryInput) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn begin_product(&self) -> StoreResult<Box<dyn ProductTx>> {
        Ok(Box::new(self.begin().await?))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn list_active_products(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = TRUE \
             ORDER BY created_at DESC, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
        active_only: bool,
    ) -> StoreResult<Vec<Product>> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));

        if active_only {
            query.push(" AND is_active = TRUE");
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        if let Some(ref search) = filter.search {
            query
                .push(" AND name ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
        if filter.in_stock == Some(true) {
            query.push(" AND stock > 0");
        }
        query.push(" ORDER BY created_at DESC, name");

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }
}

#[async_trait]
impl ProductTx for PgTx {
    async fn insert_product(&mut self, input: &ProductInput) -> StoreResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO products (category_id, name, description, price, stock, image_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.normalized_price())
        .bind(input.stock)
        .bind(&input.image_url)
        .bind(input.active())
        .fetch_one(self.conn()?)
        .await?;

        Ok(id)
    }

    async fn update_product(&mut self, id: Uuid, input: &ProductInput) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET category_id = $2, name = $3, description = $4, price = $5,
                stock = $6, image_url = $7, is_active = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.normalized_price())
        .bind(input.stock)
        .bind(&input.image_url)
        .bind(input.active())
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn begin_user(&self) -> StoreResult<Box<dyn UserTx>> {
        Ok(Box::new(self.begin().await?))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_name_exists(&self, name: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn user_email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl UserTx for PgTx {
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, provider, provider_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.provider)
        .bind(&user.provider_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(created)
    }

    async fn update_profile(&mut self, id: Uuid, changes: &UpdateProfile) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.phone)
        .bind(&changes.address)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_role(&mut self, id: Uuid, role: Role) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_sign_in(
        &mut self,
        id: Uuid,
        provider: Provider,
        provider_id: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET provider = $2,
                provider_id = COALESCE($3, provider_id),
                last_sign_in_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(provider)
        .bind(provider_id)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("laptop"), "laptop");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }

    // Queries against a live database are covered in tests/pg_store_tests.rs
}
