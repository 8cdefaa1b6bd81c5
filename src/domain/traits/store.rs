use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::User;

/// Store trait - abstraction for robot state persistence
#[async_trait]
pub trait Store: Send + Sync {
    // User operations
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError>;
    async fn save_user(&self, user: &User) -> Result<(), StorageError>;
    async fn all_users(&self) -> Result<Vec<User>, StorageError>;

    // Key-value operations
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
