use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{
    models::{key_fingerprint, App, User},
    services::{
        store::UserStore, AppRegistry, CallContext, PermissionCascade, ServiceError, StoreError,
        TokenService,
    },
    utils::{hash_password, verify_password, Password, PasswordCost},
};

/// Account operations scoped to one app, addressed by the app's secret key.
#[derive(Clone)]
pub struct AuthService {
    apps: AppRegistry,
    users: Arc<dyn UserStore>,
    tokens: TokenService,
    permissions: Arc<dyn PermissionCascade>,
    password_cost: PasswordCost,
    /// Hashed once at `password_cost`; checked on the unknown-login path.
    decoy_hash: Arc<OnceCell<Vec<u8>>>,
}

impl AuthService {
    pub fn new(
        apps: AppRegistry,
        users: Arc<dyn UserStore>,
        tokens: TokenService,
        permissions: Arc<dyn PermissionCascade>,
        password_cost: PasswordCost,
    ) -> Self {
        Self {
            apps,
            users,
            tokens,
            permissions,
            password_cost,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create a user in the app and return its id.
    pub async fn register(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
        password: &Password,
    ) -> Result<i64, ServiceError> {
        let password_hash = self.hash(ctx, password).await?;

        let app = self.apps.get_by_key(ctx, app_key).await?;

        let taken = ctx
            .run(async {
                self.users.exists(app.id, login).await.map_err(|e| {
                    tracing::error!(app_id = app.id, error = %e, "Failed to check user");
                    ServiceError::storage("users.exists")(e)
                })
            })
            .await?;
        if taken {
            return Err(ServiceError::UserAlreadyExists);
        }

        let user_id = ctx
            .run(async {
                self.users
                    .save(app.id, login, &password_hash)
                    .await
                    .map_err(|e| match e {
                        StoreError::Duplicate => ServiceError::UserAlreadyExists,
                        other => {
                            tracing::error!(app_id = app.id, error = %other, "Failed to save user");
                            ServiceError::storage("users.save")(other)
                        }
                    })
            })
            .await?;

        tracing::info!(app_id = app.id, user_id, "User registered");
        Ok(user_id)
    }

    /// Verify credentials and return a signed token.
    ///
    /// An unknown login and a wrong password are indistinguishable to the caller.
    pub async fn login(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
        password: &Password,
    ) -> Result<String, ServiceError> {
        let app = self.apps.get_by_key(ctx, app_key).await?;

        let user = match self.fetch_user(ctx, &app, login).await {
            Err(ServiceError::UserNotFound) => {
                let decoy = self.decoy_hash(ctx).await?;
                self.verify(ctx, password, decoy).await?;
                tracing::info!(app_id = app.id, "Login failed");
                return Err(ServiceError::InvalidCredentials);
            }
            other => other?,
        };

        if !self.verify(ctx, password, &user.password_hash).await? {
            tracing::info!(app_id = app.id, user_id = user.id, "Login failed");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user, &app).map_err(|e| {
            tracing::error!(app_id = app.id, error = %e, "Failed to sign token");
            e
        })?;

        tracing::info!(app_id = app.id, user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Remove the user, then their permission record.
    ///
    /// The two deletes are independent; if the second fails the user row is
    /// already gone and the error is still returned.
    pub async fn delete_user(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
    ) -> Result<(), ServiceError> {
        let app = self.apps.get_by_key(ctx, app_key).await?;
        let user = self.fetch_user(ctx, &app, login).await?;

        ctx.run(async {
            self.users.delete(app.id, login).await.map_err(|e| {
                tracing::error!(app_id = app.id, user_id = user.id, error = %e, "Failed to delete user");
                ServiceError::storage("users.delete")(e)
            })
        })
        .await?;

        if let Err(e) = self.permissions.delete(ctx, user.id).await {
            tracing::error!(
                app_id = app.id,
                user_id = user.id,
                error = %e,
                "User deleted but permission cleanup failed"
            );
            return Err(e);
        }

        tracing::info!(app_id = app.id, user_id = user.id, "User deleted");
        Ok(())
    }

    pub async fn update_login(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
        new_login: &str,
    ) -> Result<(), ServiceError> {
        let app = self.apps.get_by_key(ctx, app_key).await?;

        let taken = ctx
            .run(async {
                self.users
                    .exists(app.id, new_login)
                    .await
                    .map_err(ServiceError::storage("users.exists"))
            })
            .await?;
        if taken {
            return Err(ServiceError::UserAlreadyExists);
        }

        ctx.run(async {
            self.users
                .update_login(app.id, login, new_login)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound => ServiceError::UserNotFound,
                    StoreError::Duplicate => ServiceError::UserAlreadyExists,
                    other => {
                        tracing::error!(app_id = app.id, error = %other, "Failed to update login");
                        ServiceError::storage("users.update_login")(other)
                    }
                })
        })
        .await?;

        tracing::info!(app_id = app.id, "Login updated");
        Ok(())
    }

    pub async fn change_password(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
        new_password: &Password,
    ) -> Result<(), ServiceError> {
        let app = self.apps.get_by_key(ctx, app_key).await?;
        let password_hash = self.hash(ctx, new_password).await?;

        ctx.run(async {
            self.users
                .update_password(app.id, login, &password_hash)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound => ServiceError::UserNotFound,
                    other => {
                        tracing::error!(app_id = app.id, error = %other, "Failed to change password");
                        ServiceError::storage("users.update_password")(other)
                    }
                })
        })
        .await?;

        tracing::info!(app_id = app.id, "Password changed");
        Ok(())
    }

    /// Whether the login exists in the app. Any failure reads as `false`.
    pub async fn test_on_exist(&self, ctx: &CallContext, app_key: &[u8], login: &str) -> bool {
        match self.try_test_on_exist(ctx, app_key, login).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key = %key_fingerprint(app_key), error = %e, "User existence check failed");
                false
            }
        }
    }

    pub async fn try_test_on_exist(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
    ) -> Result<bool, ServiceError> {
        let app = self.apps.get_by_key(ctx, app_key).await?;
        ctx.run(async {
            self.users
                .exists(app.id, login)
                .await
                .map_err(ServiceError::storage("users.exists"))
        })
        .await
    }

    pub async fn get_user_id(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        login: &str,
    ) -> Result<i64, ServiceError> {
        let app = self.apps.get_by_key(ctx, app_key).await?;
        Ok(self.fetch_user(ctx, &app, login).await?.id)
    }

    /// Validate a token against the app key and return its login.
    pub fn parse_token(
        &self,
        ctx: &CallContext,
        app_key: &[u8],
        token: &str,
    ) -> Result<String, ServiceError> {
        ctx.check()?;
        self.tokens
            .validate(token, app_key)
            .map(|claims| claims.login)
            .map_err(|e| {
                tracing::info!(key = %key_fingerprint(app_key), error = %e, "Token rejected");
                e
            })
    }

    async fn fetch_user(
        &self,
        ctx: &CallContext,
        app: &App,
        login: &str,
    ) -> Result<User, ServiceError> {
        ctx.run(async {
            self.users.get(app.id, login).await.map_err(|e| match e {
                StoreError::NotFound => ServiceError::UserNotFound,
                other => {
                    tracing::error!(app_id = app.id, error = %other, "Failed to get user");
                    ServiceError::storage("users.get")(other)
                }
            })
        })
        .await
    }

    async fn hash(&self, ctx: &CallContext, password: &Password) -> Result<Vec<u8>, ServiceError> {
        let password = password.clone();
        let cost = self.password_cost;
        ctx.run(async move {
            tokio::task::spawn_blocking(move || hash_password(&password, &cost))
                .await
                .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
                .map_err(ServiceError::Internal)
        })
        .await
    }

    async fn decoy_hash(&self, ctx: &CallContext) -> Result<&[u8], ServiceError> {
        self.decoy_hash
            .get_or_try_init(|| async move {
                self.hash(ctx, &Password::new("decoy-password")).await
            })
            .await
            .map(Vec::as_slice)
    }

    async fn verify(
        &self,
        ctx: &CallContext,
        password: &Password,
        password_hash: &[u8],
    ) -> Result<bool, ServiceError> {
        let password = password.clone();
        let password_hash = password_hash.to_vec();
        ctx.run(async move {
            tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
                .await
                .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))?
                .map_err(ServiceError::Internal)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{MemoryStore, PermissionService, TimestampKeyGenerator};
    use chrono::Utc;

    struct Harness {
        store: MemoryStore,
        apps: AppRegistry,
        permissions: PermissionService,
        auth: AuthService,
        ctx: CallContext,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let apps = AppRegistry::new(
            Arc::new(store.clone()),
            Arc::new(TimestampKeyGenerator::new()),
            3,
        );
        let permissions = PermissionService::new(Arc::new(store.clone()));
        let auth = AuthService::new(
            apps.clone(),
            Arc::new(store.clone()),
            TokenService::new(chrono::Duration::seconds(3600)),
            Arc::new(permissions.clone()),
            PasswordCost::minimal(),
        );
        Harness {
            store,
            apps,
            permissions,
            auth,
            ctx: CallContext::background(),
        }
    }

    fn pw(s: &str) -> Password {
        Password::new(s)
    }

    #[tokio::test]
    async fn register_then_login_yields_token_for_login() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();

        let user_id = h.auth.register(&h.ctx, &key, "alice", &pw("secret")).await.unwrap();
        let token = h.auth.login(&h.ctx, &key, "alice", &pw("secret")).await.unwrap();

        let claims = TokenService::new(chrono::Duration::seconds(3600))
            .validate(&token, &key)
            .unwrap();
        assert_eq!(claims.login, "alice");
        assert_eq!(claims.uid, user_id);
        assert!((claims.exp - (Utc::now().timestamp() + 3600)).abs() <= 1);
        assert_eq!(h.auth.parse_token(&h.ctx, &key, &token).unwrap(), "alice");
    }

    #[tokio::test]
    async fn duplicate_register_is_scoped_to_the_app() {
        let h = harness();
        let first = h.apps.create(&h.ctx).await.unwrap();
        let second = h.apps.create(&h.ctx).await.unwrap();

        h.auth.register(&h.ctx, &first, "bob", &pw("x")).await.unwrap();
        assert!(matches!(
            h.auth.register(&h.ctx, &first, "bob", &pw("y")).await,
            Err(ServiceError::UserAlreadyExists)
        ));
        h.auth.register(&h.ctx, &second, "bob", &pw("z")).await.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_login_look_the_same() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        h.auth.register(&h.ctx, &key, "carol", &pw("right")).await.unwrap();

        let wrong = h.auth.login(&h.ctx, &key, "carol", &pw("wrong")).await;
        let unknown = h.auth.login(&h.ctx, &key, "nobody", &pw("right")).await;
        assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
        assert!(matches!(unknown, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_login_still_checks_a_password_hash() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        assert!(!h.auth.decoy_hash.initialized());

        let result = h.auth.login(&h.ctx, &key, "nobody", &pw("guess")).await;
        assert!(matches!(result, Err(ServiceError::InvalidCredentials)));

        let decoy = h.auth.decoy_hash.get().unwrap();
        assert!(decoy.starts_with(b"$argon2id$"));
        assert!(!verify_password(&pw("guess"), decoy).unwrap());
    }

    #[tokio::test]
    async fn register_against_unknown_app_fails() {
        let h = harness();
        assert!(matches!(
            h.auth.register(&h.ctx, b"no-such-app", "dave", &pw("x")).await,
            Err(ServiceError::AppNotFound)
        ));
    }

    #[tokio::test]
    async fn delete_user_cascades_to_permission() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        let id = h.auth.register(&h.ctx, &key, "erin", &pw("x")).await.unwrap();
        h.permissions.set(&h.ctx, id, 7).await.unwrap();

        h.auth.delete_user(&h.ctx, &key, "erin").await.unwrap();

        assert!(!h.auth.test_on_exist(&h.ctx, &key, "erin").await);
        assert_eq!(h.store.permission_count(), 0);
        assert!(matches!(
            h.auth.get_user_id(&h.ctx, &key, "erin").await,
            Err(ServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn failed_cascade_reports_error_after_user_is_gone() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        let id = h.auth.register(&h.ctx, &key, "frank", &pw("x")).await.unwrap();
        h.permissions.set(&h.ctx, id, 1).await.unwrap();
        h.store.fail_operation("permissions.delete");

        let result = h.auth.delete_user(&h.ctx, &key, "frank").await;
        assert!(matches!(
            result,
            Err(ServiceError::Storage { op: "permissions.delete", .. })
        ));
        h.store.clear_failures();
        assert!(!h.auth.test_on_exist(&h.ctx, &key, "frank").await);
    }

    #[tokio::test]
    async fn update_login_moves_the_account() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        h.auth.register(&h.ctx, &key, "gina", &pw("pw")).await.unwrap();
        h.auth.register(&h.ctx, &key, "hank", &pw("pw")).await.unwrap();

        assert!(matches!(
            h.auth.update_login(&h.ctx, &key, "gina", "hank").await,
            Err(ServiceError::UserAlreadyExists)
        ));
        h.auth.update_login(&h.ctx, &key, "gina", "georgina").await.unwrap();
        h.auth.login(&h.ctx, &key, "georgina", &pw("pw")).await.unwrap();
        assert!(!h.auth.test_on_exist(&h.ctx, &key, "gina").await);

        assert!(matches!(
            h.auth.update_login(&h.ctx, &key, "ghost", "spirit").await,
            Err(ServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn change_password_replaces_credentials() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        h.auth.register(&h.ctx, &key, "ivan", &pw("old")).await.unwrap();

        h.auth.change_password(&h.ctx, &key, "ivan", &pw("new")).await.unwrap();

        assert!(h.auth.login(&h.ctx, &key, "ivan", &pw("new")).await.is_ok());
        assert!(matches!(
            h.auth.login(&h.ctx, &key, "ivan", &pw("old")).await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            h.auth.change_password(&h.ctx, &key, "ghost", &pw("x")).await,
            Err(ServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_on_exist_is_false_on_failure() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        h.auth.register(&h.ctx, &key, "judy", &pw("x")).await.unwrap();
        assert!(h.auth.test_on_exist(&h.ctx, &key, "judy").await);

        h.store.fail_operation("users.exists");
        assert!(!h.auth.test_on_exist(&h.ctx, &key, "judy").await);
        assert!(h.auth.try_test_on_exist(&h.ctx, &key, "judy").await.is_err());
        assert!(!h.auth.test_on_exist(&h.ctx, b"unknown-app", "judy").await);
    }

    #[tokio::test]
    async fn token_from_one_app_fails_under_another() {
        let h = harness();
        let first = h.apps.create(&h.ctx).await.unwrap();
        let second = h.apps.create(&h.ctx).await.unwrap();
        h.auth.register(&h.ctx, &first, "kate", &pw("x")).await.unwrap();
        let token = h.auth.login(&h.ctx, &first, "kate", &pw("x")).await.unwrap();

        assert!(matches!(
            h.auth.parse_token(&h.ctx, &second, &token),
            Err(ServiceError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn cancelled_context_aborts_register_before_writing() {
        let h = harness();
        let key = h.apps.create(&h.ctx).await.unwrap();
        let ctx = CallContext::background();
        ctx.cancel();

        assert!(matches!(
            h.auth.register(&ctx, &key, "leo", &pw("x")).await,
            Err(ServiceError::Cancelled)
        ));
        assert!(!h.auth.test_on_exist(&h.ctx, &key, "leo").await);
    }
}
