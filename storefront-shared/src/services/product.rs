/// Product service
///
/// Admins see every product; everyone else only active ones. Visibility is
/// decided by which store method is called, never by filtering afterwards.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use super::{commit, found, rollback_on_err};
use crate::error::{AppError, AppResult, Dependency, Entity, Operation};
use crate::models::{Product, ProductFilter, ProductInput};
use crate::store::{ProductStore, StoreError};

pub struct ProductService {
    store: Option<Arc<dyn ProductStore>>,
}

fn validate(input: &ProductInput) -> AppResult<()> {
    input.validate()?;
    input
        .check_price_and_category()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))
}

/// Writes naming a category that does not exist report the category as missing
fn write_error(op: Operation) -> impl FnOnce(StoreError) -> AppError {
    move |source| match source {
        StoreError::ForeignKeyViolation { .. } => AppError::NotFound(Entity::Category),
        source => AppError::Operation { op, source },
    }
}

fn validate_filter(filter: &ProductFilter) -> AppResult<()> {
    let negative = |price: Option<rust_decimal::Decimal>| price.map_or(false, |p| p.is_sign_negative());
    if negative(filter.min_price) || negative(filter.max_price) {
        return Err(AppError::InvalidRequest("price bounds cannot be negative".to_string()));
    }
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(AppError::InvalidRequest(
                "min_price cannot be greater than max_price".to_string(),
            ));
        }
    }
    if filter.search.as_ref().map_or(false, |s| s.chars().count() > 255) {
        return Err(AppError::InvalidRequest(
            "search must be at most 255 characters".to_string(),
        ));
    }
    Ok(())
}

impl ProductService {
    pub fn new(store: Option<Arc<dyn ProductStore>>) -> Self {
        Self { store }
    }

    fn store(&self) -> AppResult<&dyn ProductStore> {
        self.store
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::Database))
    }

    pub async fn create(&self, input: ProductInput) -> AppResult<Uuid> {
        let store = self.store()?;
        validate(&input)?;

        let mut tx = store.begin_product().await.map_err(AppError::Transaction)?;
        let result = tx
            .insert_product(&input)
            .await
            .map_err(write_error(Operation::CreateProduct));
        let id = rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(product_id = %id, name = %input.name, "Product created");
        Ok(id)
    }

    /// Replaces every field of the product
    pub async fn update(&self, id: Uuid, input: ProductInput) -> AppResult<()> {
        let store = self.store()?;
        validate(&input)?;

        let mut tx = store.begin_product().await.map_err(AppError::Transaction)?;
        let result = tx
            .update_product(id, &input)
            .await
            .map_err(write_error(Operation::UpdateProduct))
            .and_then(|updated| found(updated, Entity::Product));
        rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(product_id = %id, "Product updated");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let store = self.store()?;

        let mut tx = store.begin_product().await.map_err(AppError::Transaction)?;
        let result = tx
            .delete_product(id)
            .await
            .map_err(AppError::operation(Operation::DeleteProduct))
            .and_then(|deleted| found(deleted, Entity::Product));
        rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(product_id = %id, "Product deleted");
        Ok(())
    }

    pub async fn get_all(&self, is_admin: bool) -> AppResult<Vec<Product>> {
        let store = self.store()?;
        let products = if is_admin {
            store.list_products().await
        } else {
            store.list_active_products().await
        };
        products.map_err(AppError::Database)
    }

    /// Inactive products are reported as missing to non-admins
    pub async fn get_by_id(&self, id: Uuid, is_admin: bool) -> AppResult<Product> {
        self.store()?
            .find_product(id)
            .await
            .map_err(AppError::Database)?
            .filter(|product| is_admin || product.is_active)
            .ok_or(AppError::NotFound(Entity::Product))
    }

    pub async fn filter(&self, filter: ProductFilter, is_admin: bool) -> AppResult<Vec<Product>> {
        let store = self.store()?;
        validate_filter(&filter)?;

        store
            .filter_products(&filter, !is_admin)
            .await
            .map_err(AppError::Database)
    }
}
