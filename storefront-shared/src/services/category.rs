/// Category service

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use super::{commit, found, rollback_on_err};
use crate::error::{AppError, AppResult, Dependency, Entity, Operation};
use crate::models::{Category, CategoryInput};
use crate::store::CategoryStore;

pub struct CategoryService {
    store: Option<Arc<dyn CategoryStore>>,
}

impl CategoryService {
    pub fn new(store: Option<Arc<dyn CategoryStore>>) -> Self {
        Self { store }
    }

    fn store(&self) -> AppResult<&dyn CategoryStore> {
        self.store
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::Database))
    }

    pub async fn create(&self, input: CategoryInput) -> AppResult<Uuid> {
        let store = self.store()?;
        input.validate()?;

        let mut tx = store.begin_category().await.map_err(AppError::Transaction)?;
        let result = tx
            .insert_category(&input)
            .await
            .map_err(AppError::operation(Operation::CreateCategory));
        let id = rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(category_id = %id, name = %input.name, "Category created");
        Ok(id)
    }

    pub async fn update(&self, id: Uuid, input: CategoryInput) -> AppResult<()> {
        let store = self.store()?;
        input.validate()?;

        let mut tx = store.begin_category().await.map_err(AppError::Transaction)?;
        let result = tx
            .update_category(id, &input)
            .await
            .map_err(AppError::operation(Operation::UpdateCategory))
            .and_then(|updated| found(updated, Entity::Category));
        rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(category_id = %id, "Category updated");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let store = self.store()?;

        let mut tx = store.begin_category().await.map_err(AppError::Transaction)?;
        let result = tx
            .delete_category(id)
            .await
            .map_err(AppError::operation(Operation::DeleteCategory))
            .and_then(|deleted| found(deleted, Entity::Category));
        rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(category_id = %id, "Category deleted");
        Ok(())
    }

    pub async fn get_all(&self) -> AppResult<Vec<Category>> {
        self.store()?
            .list_categories()
            .await
            .map_err(AppError::Database)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Category> {
        self.store()?
            .find_category(id)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound(Entity::Category))
    }
}
