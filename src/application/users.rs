//! User roster backed by the robot's store

use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::entities::User;
use crate::domain::traits::Store;

/// Known users keyed by id
#[derive(Clone)]
pub struct UserMap {
    store: Arc<dyn Store>,
}

impl UserMap {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Look up a user, failing with `NotFound` when the id is unknown
    pub async fn get(&self, id: &str) -> Result<User, BotError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| BotError::NotFound(format!("user {}", id)))
    }

    pub async fn set(&self, user: &User) -> Result<(), BotError> {
        self.store.save_user(user).await?;
        Ok(())
    }

    pub async fn all(&self) -> Result<Vec<User>, BotError> {
        Ok(self.store.all_users().await?)
    }
}
