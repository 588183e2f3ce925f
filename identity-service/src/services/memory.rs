//! In-memory store backend.
//!
//! Used by the test suite and by `STORAGE_BACKEND=memory` for local runs.
//! Mirrors the relational constraints: unique app keys, unique
//! `(app_id, login)`, one permission row per user.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{App, Permission, User};
use crate::services::store::{AppStore, PermissionStore, UserStore};
use crate::services::StoreError;

#[derive(Default)]
struct Tables {
    apps: Vec<App>,
    last_app_id: i32,
    users: Vec<User>,
    last_user_id: i64,
    permissions: HashMap<i64, i32>,
    permission_writes: usize,
    failing: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
}

/// Shared in-memory tables; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` (e.g. `"permissions.delete"`) fail with a
    /// backend error until [`MemoryStore::clear_failures`] is called.
    pub fn fail_operation(&self, op: &'static str) {
        if let Ok(mut tables) = self.inner.lock() {
            tables.failing.insert(op);
        }
    }

    /// Delay every call to `op` by `delay` before it touches the tables.
    pub fn delay_operation(&self, op: &'static str, delay: Duration) {
        if let Ok(mut tables) = self.inner.lock() {
            tables.delays.insert(op, delay);
        }
    }

    pub fn clear_delays(&self) {
        if let Ok(mut tables) = self.inner.lock() {
            tables.delays.clear();
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut tables) = self.inner.lock() {
            tables.failing.clear();
        }
    }

    pub fn permission_count(&self) -> usize {
        self.inner.lock().map(|t| t.permissions.len()).unwrap_or(0)
    }

    /// Number of successful permission saves and updates so far.
    pub fn permission_writes(&self) -> usize {
        self.inner.lock().map(|t| t.permission_writes).unwrap_or(0)
    }

    async fn tables(&self, op: &'static str) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let delay = self
            .inner
            .lock()
            .ok()
            .and_then(|t| t.delays.get(op).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let tables = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store lock poisoned")))?;
        if tables.failing.contains(op) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "injected failure in {}",
                op
            )));
        }
        Ok(tables)
    }
}

#[async_trait]
impl AppStore for MemoryStore {
    async fn save(&self, key: &[u8]) -> Result<App, StoreError> {
        let mut tables = self.tables("apps.save").await?;
        if tables.apps.iter().any(|a| a.key == key) {
            return Err(StoreError::Duplicate);
        }
        tables.last_app_id += 1;
        let app = App::new(tables.last_app_id, key.to_vec());
        tables.apps.push(app.clone());
        Ok(app)
    }

    async fn get_by_key(&self, key: &[u8]) -> Result<App, StoreError> {
        let tables = self.tables("apps.get_by_key").await?;
        tables
            .apps
            .iter()
            .find(|a| a.key == key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_key(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut tables = self.tables("apps.delete_by_key").await?;
        tables.apps.retain(|a| a.key != key);
        Ok(())
    }

    async fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        let tables = self.tables("apps.exists").await?;
        Ok(tables.apps.iter().any(|a| a.key == key))
    }

    async fn list(&self) -> Result<Vec<App>, StoreError> {
        let tables = self.tables("apps.list").await?;
        Ok(tables.apps.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn save(
        &self,
        app_id: i32,
        login: &str,
        password_hash: &[u8],
    ) -> Result<i64, StoreError> {
        let mut tables = self.tables("users.save").await?;
        if tables
            .users
            .iter()
            .any(|u| u.app_id == app_id && u.login == login)
        {
            return Err(StoreError::Duplicate);
        }
        tables.last_user_id += 1;
        let id = tables.last_user_id;
        tables.users.push(User {
            id,
            app_id,
            login: login.to_string(),
            password_hash: password_hash.to_vec(),
        });
        Ok(id)
    }

    async fn get(&self, app_id: i32, login: &str) -> Result<User, StoreError> {
        let tables = self.tables("users.get").await?;
        tables
            .users
            .iter()
            .find(|u| u.app_id == app_id && u.login == login)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, app_id: i32, login: &str) -> Result<(), StoreError> {
        let mut tables = self.tables("users.delete").await?;
        tables
            .users
            .retain(|u| !(u.app_id == app_id && u.login == login));
        Ok(())
    }

    async fn update_login(
        &self,
        app_id: i32,
        login: &str,
        new_login: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables("users.update_login").await?;
        if login != new_login
            && tables
                .users
                .iter()
                .any(|u| u.app_id == app_id && u.login == new_login)
        {
            return Err(StoreError::Duplicate);
        }
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.app_id == app_id && u.login == login)
            .ok_or(StoreError::NotFound)?;
        user.login = new_login.to_string();
        Ok(())
    }

    async fn update_password(
        &self,
        app_id: i32,
        login: &str,
        password_hash: &[u8],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables("users.update_password").await?;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.app_id == app_id && u.login == login)
            .ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_vec();
        Ok(())
    }

    async fn exists(&self, app_id: i32, login: &str) -> Result<bool, StoreError> {
        let tables = self.tables("users.exists").await?;
        Ok(tables
            .users
            .iter()
            .any(|u| u.app_id == app_id && u.login == login))
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn save(&self, user_id: i64, value: i32) -> Result<(), StoreError> {
        let mut tables = self.tables("permissions.save").await?;
        if tables.permissions.contains_key(&user_id) {
            return Err(StoreError::Duplicate);
        }
        tables.permissions.insert(user_id, value);
        tables.permission_writes += 1;
        Ok(())
    }

    async fn get(&self, user_id: i64) -> Result<Permission, StoreError> {
        let tables = self.tables("permissions.get").await?;
        tables
            .permissions
            .get(&user_id)
            .map(|&value| Permission { user_id, value })
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user_id: i64, value: i32) -> Result<(), StoreError> {
        let mut tables = self.tables("permissions.update").await?;
        let slot = tables
            .permissions
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound)?;
        *slot = value;
        tables.permission_writes += 1;
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables("permissions.delete").await?;
        tables.permissions.remove(&user_id);
        Ok(())
    }
}
