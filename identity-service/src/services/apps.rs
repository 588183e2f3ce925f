//! App registry: tenant lifecycle keyed by secret key.

use std::sync::Arc;

use crate::models::{key_fingerprint, App};
use crate::services::keygen::KeyGenerator;
use crate::services::store::AppStore;
use crate::services::{CallContext, ServiceError, StoreError};

#[derive(Clone)]
pub struct AppRegistry {
    store: Arc<dyn AppStore>,
    keygen: Arc<dyn KeyGenerator>,
    max_attempts: u32,
}

impl AppRegistry {
    pub fn new(store: Arc<dyn AppStore>, keygen: Arc<dyn KeyGenerator>, max_attempts: u32) -> Self {
        Self {
            store,
            keygen,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Generate a fresh key, persist the app and return the key.
    ///
    /// A generated key that is already registered (seen either by the
    /// existence check or by the unique index on save) is discarded and a new
    /// one is generated, up to `max_attempts` times.
    pub async fn create(&self, ctx: &CallContext) -> Result<Vec<u8>, ServiceError> {
        for attempt in 1..=self.max_attempts {
            let key = self.keygen.generate();

            let taken = ctx
                .run(async {
                    self.store
                        .exists(&key)
                        .await
                        .map_err(ServiceError::storage("apps.exists"))
                })
                .await?;
            if taken {
                tracing::warn!(attempt, "Generated app key already registered, regenerating");
                continue;
            }

            let saved = ctx
                .run(async {
                    match self.store.save(&key).await {
                        Ok(app) => Ok(Some(app)),
                        Err(StoreError::Duplicate) => Ok(None),
                        Err(e) => Err(ServiceError::storage("apps.save")(e)),
                    }
                })
                .await;

            match saved {
                Ok(Some(app)) => {
                    tracing::info!(app_id = app.id, key = %app.fingerprint(), "App created");
                    return Ok(key);
                }
                Ok(None) => {
                    tracing::warn!(attempt, "App key collided on save, regenerating");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to save app");
                    return Err(e);
                }
            }
        }

        tracing::error!(attempts = self.max_attempts, "Could not generate a unique app key");
        Err(ServiceError::storage("apps.save")(StoreError::Duplicate))
    }

    pub async fn get_by_key(&self, ctx: &CallContext, key: &[u8]) -> Result<App, ServiceError> {
        ctx.run(async {
            self.store.get_by_key(key).await.map_err(|e| match e {
                StoreError::NotFound => ServiceError::AppNotFound,
                other => {
                    tracing::error!(key = %key_fingerprint(key), error = %other, "Failed to get app");
                    ServiceError::storage("apps.get_by_key")(other)
                }
            })
        })
        .await
    }

    /// Remove the app. Deleting an unknown key succeeds.
    pub async fn delete_by_key(&self, ctx: &CallContext, key: &[u8]) -> Result<(), ServiceError> {
        ctx.run(async {
            self.store.delete_by_key(key).await.map_err(|e| {
                tracing::error!(key = %key_fingerprint(key), error = %e, "Failed to delete app");
                ServiceError::storage("apps.delete_by_key")(e)
            })
        })
        .await?;

        tracing::info!(key = %key_fingerprint(key), "App deleted");
        Ok(())
    }

    /// Existence check that reports any failure as `false`.
    pub async fn exists(&self, ctx: &CallContext, key: &[u8]) -> bool {
        match self.try_exists(ctx, key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key = %key_fingerprint(key), error = %e, "App existence check failed");
                false
            }
        }
    }

    pub async fn try_exists(&self, ctx: &CallContext, key: &[u8]) -> Result<bool, ServiceError> {
        ctx.run(async {
            self.store
                .exists(key)
                .await
                .map_err(ServiceError::storage("apps.exists"))
        })
        .await
    }

    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<App>, ServiceError> {
        ctx.run(async {
            self.store.list().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to list apps");
                ServiceError::storage("apps.list")(e)
            })
        })
        .await
    }
}
