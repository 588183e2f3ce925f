//! Per-user permission value with get / upsert / delete.

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::store::PermissionStore;
use crate::services::{CallContext, ServiceError, StoreError};

/// Hook the auth service uses to drop a user's permission on delete.
#[async_trait]
pub trait PermissionCascade: Send + Sync {
    async fn delete(&self, ctx: &CallContext, user_id: i64) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn PermissionStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, ctx: &CallContext, user_id: i64) -> Result<i32, ServiceError> {
        ctx.run(async {
            match self.store.get(user_id).await {
                Ok(permission) => Ok(permission.value),
                Err(StoreError::NotFound) => Err(ServiceError::PermissionNotFound),
                Err(e) => {
                    tracing::error!(user_id, error = %e, "Failed to get permission");
                    Err(ServiceError::storage("permissions.get")(e))
                }
            }
        })
        .await
    }

    /// Insert the value, or update it when it differs from the stored one.
    ///
    /// Not atomic. A concurrent insert that wins the race surfaces here as
    /// `Duplicate`, after which the update path is taken once.
    pub async fn set(&self, ctx: &CallContext, user_id: i64, value: i32) -> Result<(), ServiceError> {
        match self.get(ctx, user_id).await {
            Ok(current) if current == value => {
                tracing::debug!(user_id, "Permission unchanged");
                Ok(())
            }
            Ok(_) => self.update(ctx, user_id, value).await,
            Err(ServiceError::PermissionNotFound) => {
                let saved = ctx
                    .run(async {
                        match self.store.save(user_id, value).await {
                            Ok(()) => Ok(true),
                            Err(StoreError::Duplicate) => Ok(false),
                            Err(e) => {
                                tracing::error!(user_id, error = %e, "Failed to save permission");
                                Err(ServiceError::storage("permissions.save")(e))
                            }
                        }
                    })
                    .await?;

                if saved {
                    tracing::info!(user_id, "Permission created");
                    return Ok(());
                }

                tracing::warn!(user_id, "Permission created concurrently, updating instead");
                match self.get(ctx, user_id).await? {
                    current if current == value => Ok(()),
                    _ => self.update(ctx, user_id, value).await,
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the user's permission. Absent records are not an error.
    pub async fn delete(&self, ctx: &CallContext, user_id: i64) -> Result<(), ServiceError> {
        match self.get(ctx, user_id).await {
            Ok(_) => {}
            Err(ServiceError::PermissionNotFound) => return Ok(()),
            Err(e) => return Err(e),
        }

        ctx.run(async {
            self.store.delete(user_id).await.map_err(|e| {
                tracing::error!(user_id, error = %e, "Failed to delete permission");
                ServiceError::storage("permissions.delete")(e)
            })
        })
        .await
    }

    async fn update(&self, ctx: &CallContext, user_id: i64, value: i32) -> Result<(), ServiceError> {
        ctx.run(async {
            self.store.update(user_id, value).await.map_err(|e| {
                tracing::error!(user_id, error = %e, "Failed to update permission");
                ServiceError::storage("permissions.update")(e)
            })
        })
        .await?;

        tracing::info!(user_id, "Permission updated");
        Ok(())
    }
}

#[async_trait]
impl PermissionCascade for PermissionService {
    async fn delete(&self, ctx: &CallContext, user_id: i64) -> Result<(), ServiceError> {
        PermissionService::delete(self, ctx, user_id).await
    }
}
