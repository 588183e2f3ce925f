//! Test helper module for identity-service integration tests.
//!
//! Boots the real gRPC and admin HTTP servers on ephemeral ports against the
//! in-memory store.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};

use identity_service::config::{
    Environment, GrpcConfig, IdentityConfig, KeyConfig, SecurityConfig, StorageBackend,
    StorageConfig, TokenConfig,
};
use identity_service::grpc::proto::{
    apps_client::AppsClient, auth_client::AuthClient, permissions_client::PermissionsClient,
    NewAppRequest, RegisterRequest,
};
use identity_service::services::{KeyGeneratorKind, MemoryStore};
use identity_service::startup::Application;
use identity_service::utils::PasswordCost;
use identity_service::AppState;
use service_core::config::Config as CoreConfig;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;

pub const TEST_ADMIN_KEY: &str = "test-admin-key";

pub fn test_config() -> IdentityConfig {
    IdentityConfig {
        common: CoreConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0, // Random port
            grpc_port: None,
        },
        environment: Environment::Dev,
        service_name: "identity-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 1,
            min_connections: 1,
        },
        token: TokenConfig { ttl_seconds: 3600 },
        password: PasswordCost::minimal(),
        keys: KeyConfig {
            generator: KeyGeneratorKind::Timestamp,
            max_attempts: 3,
        },
        security: SecurityConfig {
            admin_api_key: None,
        },
        grpc: GrpcConfig {
            request_timeout_seconds: 30,
        },
    }
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub grpc_address: String,
    pub store: MemoryStore,
    pub http: reqwest::Client,
    shutdown: CancellationToken,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut IdentityConfig)) -> Self {
        let mut config = test_config();
        configure(&mut config);

        let store = MemoryStore::new();
        let state = AppState::with_memory_store(config, store.clone());
        let app = Application::build_with_state(state)
            .await
            .expect("Failed to build test application");

        let http_address = format!("http://127.0.0.1:{}", app.http_port());
        let grpc_address = format!("http://127.0.0.1:{}", app.grpc_port());

        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            app.run_until(stop.cancelled_owned()).await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let http = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if http.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            grpc_address,
            store,
            http,
            shutdown,
        }
    }

    async fn channel(&self) -> Channel {
        for _ in 0..50 {
            if let Ok(channel) = Channel::from_shared(self.grpc_address.clone())
                .expect("valid gRPC address")
                .connect()
                .await
            {
                return channel;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
        panic!("Failed to connect to gRPC server at {}", self.grpc_address);
    }

    pub async fn auth_client(&self) -> AuthClient<Channel> {
        AuthClient::new(self.channel().await)
    }

    pub async fn apps_client(&self) -> AppsClient<Channel> {
        AppsClient::new(self.channel().await)
    }

    pub async fn permissions_client(&self) -> PermissionsClient<Channel> {
        PermissionsClient::new(self.channel().await)
    }

    /// Create an app over gRPC and return its key.
    pub async fn new_app(&self) -> Vec<u8> {
        self.apps_client()
            .await
            .new_app(NewAppRequest {})
            .await
            .expect("NewApp should succeed")
            .into_inner()
            .key
    }

    pub async fn register(&self, app_key: &[u8], login: &str, password: &str) {
        self.auth_client()
            .await
            .register(RegisterRequest {
                app_key: app_key.to_vec(),
                login: login.to_string(),
                password: password.to_string(),
            })
            .await
            .expect("Register should succeed");
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.http_address, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
