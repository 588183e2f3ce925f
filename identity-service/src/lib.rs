pub mod config;
pub mod grpc;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::IdentityConfig;
use crate::services::{
    AppRegistry, AppStore, AuthService, Database, KeyGenerator, MemoryStore, PermissionService,
    PermissionStore, TokenService, UserStore,
};

/// Services shared by the gRPC and admin HTTP surfaces.
#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub apps: AppRegistry,
    pub auth: AuthService,
    pub permissions: PermissionService,
    /// Present only with the Postgres backend; used by the health probe.
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        config: IdentityConfig,
        app_store: Arc<dyn AppStore>,
        user_store: Arc<dyn UserStore>,
        permission_store: Arc<dyn PermissionStore>,
        database: Option<Database>,
    ) -> Self {
        let keygen: Arc<dyn KeyGenerator> = Arc::from(config.keys.generator.build());
        let apps = AppRegistry::new(app_store, keygen, config.keys.max_attempts);
        let permissions = PermissionService::new(permission_store);
        let auth = AuthService::new(
            apps.clone(),
            user_store,
            TokenService::new(config.token.ttl()),
            Arc::new(permissions.clone()),
            config.password,
        );

        Self {
            config,
            apps,
            auth,
            permissions,
            database,
        }
    }

    pub fn with_database(config: IdentityConfig, db: Database) -> Self {
        let store = Arc::new(db.clone());
        Self::new(config, store.clone(), store.clone(), store, Some(db))
    }

    pub fn with_memory_store(config: IdentityConfig, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store.clone(), store, None)
    }
}

/// Admin HTTP router: operator page, app lifecycle endpoints and health.
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/new_app", post(handlers::apps::new_app))
        .route("/get_apps", post(handlers::apps::get_apps))
        .route("/delete_app", post(handlers::apps::delete_app))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::apps::index))
        .route("/health", get(handlers::health_check))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(admin_api_key: Option<&str>) -> AppState {
        let mut config = IdentityConfig {
            common: service_core::config::Config::default(),
            environment: config::Environment::Dev,
            service_name: "identity-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            storage: config::StorageConfig {
                backend: config::StorageBackend::Memory,
                database_url: None,
                max_connections: 1,
                min_connections: 1,
            },
            token: config::TokenConfig { ttl_seconds: 60 },
            password: utils::PasswordCost::minimal(),
            keys: config::KeyConfig {
                generator: services::KeyGeneratorKind::Timestamp,
                max_attempts: 3,
            },
            security: config::SecurityConfig {
                admin_api_key: None,
            },
            grpc: config::GrpcConfig {
                request_timeout_seconds: 30,
            },
        };
        config.security.admin_api_key = admin_api_key.map(str::to_string);
        AppState::with_memory_store(config, MemoryStore::new())
    }

    #[tokio::test]
    async fn new_app_returns_hex_key() {
        let response = build_router(state(None))
            .oneshot(Request::post("/new_app").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["key"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn admin_routes_require_key_when_configured() {
        let router = build_router(state(Some("s3cret")));

        let denied = router
            .clone()
            .oneshot(Request::post("/get_apps").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = router
            .oneshot(
                Request::post("/get_apps")
                    .header("x-admin-api-key", "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let response = build_router(state(None))
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }
}
