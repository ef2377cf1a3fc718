/// User profile and role management

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use super::{commit, found, rollback_on_err};
use crate::error::{AppError, AppResult, Dependency, Entity, Operation};
use crate::models::{Role, UpdateProfile, UserProfile};
use crate::store::UserStore;

pub struct UserService {
    store: Option<Arc<dyn UserStore>>,
}

impl UserService {
    pub fn new(store: Option<Arc<dyn UserStore>>) -> Self {
        Self { store }
    }

    fn store(&self) -> AppResult<&dyn UserStore> {
        self.store
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::Database))
    }

    pub async fn get_profile(&self, id: Uuid) -> AppResult<UserProfile> {
        self.store()?
            .find_user(id)
            .await
            .map_err(AppError::Database)?
            .map(UserProfile::from)
            .ok_or(AppError::NotFound(Entity::User))
    }

    /// Writes the fields that are set; at least one is required
    pub async fn update_profile(&self, id: Uuid, changes: UpdateProfile) -> AppResult<()> {
        let store = self.store()?;
        changes.validate()?;
        if changes.is_empty() {
            return Err(AppError::InvalidRequest(
                "at least one of name, phone or address is required".to_string(),
            ));
        }

        let mut tx = store.begin_user().await.map_err(AppError::Transaction)?;
        let result = tx
            .update_profile(id, &changes)
            .await
            .map_err(AppError::operation(Operation::UpdateProfile))
            .and_then(|updated| found(updated, Entity::User));
        rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(user_id = %id, "Profile updated");
        Ok(())
    }

    /// Grants the admin role to `target_id`
    ///
    /// Only an admin may promote; the check happens before any store call.
    pub async fn promote(&self, acting_role: Role, target_id: Uuid) -> AppResult<()> {
        if !acting_role.is_admin() {
            return Err(AppError::UnauthorizedUser);
        }
        let store = self.store()?;

        let target = store
            .find_user(target_id)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound(Entity::User))?;
        if target.role.is_admin() {
            return Err(AppError::AlreadyAdmin);
        }

        let mut tx = store.begin_user().await.map_err(AppError::Transaction)?;
        let result = tx
            .set_role(target_id, Role::Admin)
            .await
            .map_err(AppError::operation(Operation::PromoteUser))
            .and_then(|updated| found(updated, Entity::User));
        rollback_on_err(tx.as_mut(), result).await?;
        commit(tx.as_mut()).await?;

        debug!(user_id = %target_id, "User promoted to admin");
        Ok(())
    }
}
