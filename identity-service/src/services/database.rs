//! PostgreSQL store backend.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use crate::models::{App, Permission, User};
use crate::services::store::{AppStore, PermissionStore, UserStore};
use crate::services::StoreError;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "identity-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

// =========================================================================
// Apps
// =========================================================================

#[async_trait]
impl AppStore for Database {
    async fn save(&self, key: &[u8]) -> Result<App, StoreError> {
        let app = sqlx::query_as::<_, App>(
            "INSERT INTO apps (secret_key) VALUES ($1) RETURNING id, secret_key",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(app)
    }

    async fn get_by_key(&self, key: &[u8]) -> Result<App, StoreError> {
        let app = sqlx::query_as::<_, App>("SELECT id, secret_key FROM apps WHERE secret_key = $1")
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        Ok(app)
    }

    async fn delete_by_key(&self, key: &[u8]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM apps WHERE secret_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM apps WHERE secret_key = $1)")
                .bind(key)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<App>, StoreError> {
        let apps = sqlx::query_as::<_, App>("SELECT id, secret_key FROM apps ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(apps)
    }
}

// =========================================================================
// Users
// =========================================================================

#[async_trait]
impl UserStore for Database {
    async fn save(
        &self,
        app_id: i32,
        login: &str,
        password_hash: &[u8],
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (app_id, login, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(app_id)
        .bind(login)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get(&self, app_id: i32, login: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, app_id, login, password_hash FROM users WHERE app_id = $1 AND login = $2",
        )
        .bind(app_id)
        .bind(login)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete(&self, app_id: i32, login: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE app_id = $1 AND login = $2")
            .bind(app_id)
            .bind(login)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_login(
        &self,
        app_id: i32,
        login: &str,
        new_login: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET login = $3 WHERE app_id = $1 AND login = $2")
            .bind(app_id)
            .bind(login)
            .bind(new_login)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        app_id: i32,
        login: &str,
        password_hash: &[u8],
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $3 WHERE app_id = $1 AND login = $2")
                .bind(app_id)
                .bind(login)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn exists(&self, app_id: i32, login: &str) -> Result<bool, StoreError> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE app_id = $1 AND login = $2)",
        )
        .bind(app_id)
        .bind(login)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }
}

// =========================================================================
// Permissions
// =========================================================================

#[async_trait]
impl PermissionStore for Database {
    async fn save(&self, user_id: i64, value: i32) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO permissions (user_id, permission) VALUES ($1, $2)")
            .bind(user_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: i64) -> Result<Permission, StoreError> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT user_id, permission FROM permissions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(permission)
    }

    async fn update(&self, user_id: i64, value: i32) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE permissions SET permission = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
