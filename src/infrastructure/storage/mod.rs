//! In-memory storage implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::User;
use crate::domain::traits::Store;

/// Process-lifetime store
#[derive(Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    kv: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn all_users(&self) -> Result<Vec<User>, StorageError> {
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let kv = self.kv.read().await;
        Ok(kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_get_user() {
        let store = MemoryStore::new();
        let user = User::new("1_1@chat.hipchat.com", "Ann").with_mention_name("Ann");
        store.save_user(&user).await.unwrap();

        assert_eq!(store.get_user(&user.id).await.unwrap(), Some(user));
        assert_eq!(store.get_user("missing").await.unwrap(), None);
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn key_value_round_trip_and_delete() {
        let store = MemoryStore::new();
        store.set("brain", "{}").await.unwrap();
        assert_eq!(store.get("brain").await.unwrap().as_deref(), Some("{}"));

        store.delete("brain").await.unwrap();
        assert_eq!(store.get("brain").await.unwrap(), None);
    }
}
