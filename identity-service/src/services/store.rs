//! Storage contracts consumed by the identity services.
//!
//! Each store is a narrow capability interface so the relational backend,
//! the in-memory backend, or a test double can satisfy it. Stores enforce
//! only their own uniqueness constraints; tenant scoping and cascades are
//! the services' job.

use async_trait::async_trait;

use crate::models::{App, Permission, User};
use crate::services::StoreError;

#[async_trait]
pub trait AppStore: Send + Sync {
    /// Persist a new app. `Duplicate` if the key is already taken.
    async fn save(&self, key: &[u8]) -> Result<App, StoreError>;
    async fn get_by_key(&self, key: &[u8]) -> Result<App, StoreError>;
    /// Deleting a key that does not exist is not an error.
    async fn delete_by_key(&self, key: &[u8]) -> Result<(), StoreError>;
    async fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;
    async fn list(&self) -> Result<Vec<App>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user and return its id. `Duplicate` on `(app_id, login)` collision.
    async fn save(&self, app_id: i32, login: &str, password_hash: &[u8])
        -> Result<i64, StoreError>;
    async fn get(&self, app_id: i32, login: &str) -> Result<User, StoreError>;
    async fn delete(&self, app_id: i32, login: &str) -> Result<(), StoreError>;
    /// `NotFound` if no user matched, `Duplicate` if `new_login` is taken.
    async fn update_login(
        &self,
        app_id: i32,
        login: &str,
        new_login: &str,
    ) -> Result<(), StoreError>;
    /// `NotFound` if no user matched.
    async fn update_password(
        &self,
        app_id: i32,
        login: &str,
        password_hash: &[u8],
    ) -> Result<(), StoreError>;
    async fn exists(&self, app_id: i32, login: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// `Duplicate` if the user already has a record.
    async fn save(&self, user_id: i64, value: i32) -> Result<(), StoreError>;
    async fn get(&self, user_id: i64) -> Result<Permission, StoreError>;
    async fn update(&self, user_id: i64, value: i32) -> Result<(), StoreError>;
    async fn delete(&self, user_id: i64) -> Result<(), StoreError>;
}
