//! Application startup and lifecycle management.

use std::future::Future;

use service_core::error::AppError;
use service_core::grpc::{create_reflection_service, GrpcServerBuilder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::{Environment, IdentityConfig, StorageBackend};
use crate::grpc::proto::{
    apps_server::AppsServer, auth_server::AuthServer, permissions_server::PermissionsServer,
    FILE_DESCRIPTOR_SET,
};
use crate::grpc::{AppsServiceImpl, AuthServiceImpl, PermissionsServiceImpl};
use crate::services::{Database, MemoryStore};
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    grpc_port: u16,
    http_listener: TcpListener,
    grpc_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect the configured storage backend and bind both listeners.
    pub async fn build(config: IdentityConfig) -> Result<Self, AppError> {
        let state = match config.storage.backend {
            StorageBackend::Postgres => {
                let url = config.storage.database_url.as_deref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required for postgres"))
                })?;

                let db = Database::new(
                    url,
                    config.storage.max_connections,
                    config.storage.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;

                AppState::with_database(config, db)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                AppState::with_memory_store(config, MemoryStore::new())
            }
        };

        Self::build_with_state(state).await
    }

    /// Bind listeners for an already assembled state.
    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        let http_addr = state.config.common.http_addr();
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        let grpc_addr = state.config.common.grpc_addr();
        let grpc_listener = TcpListener::bind(grpc_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %grpc_addr, "Failed to bind gRPC listener");
            AppError::from(e)
        })?;
        let grpc_port = grpc_listener.local_addr()?.port();

        tracing::info!(
            http_port = http_port,
            grpc_port = grpc_port,
            "Identity service listeners bound"
        );

        Ok(Self {
            http_port,
            grpc_port,
            http_listener,
            grpc_listener,
            state,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn grpc_port(&self) -> u16 {
        self.grpc_port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve HTTP and gRPC until `shutdown` resolves or either server fails,
    /// then drain both.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = self.state.config.clone();
        let stop = CancellationToken::new();

        let trigger = stop.clone();
        tokio::spawn(async move {
            shutdown.await;
            trigger.cancel();
        });

        let http_router = build_router(self.state.clone());

        // gRPC health service
        let (mut health_reporter, grpc_health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<AuthServer<AuthServiceImpl>>()
            .await;
        health_reporter
            .set_serving::<AppsServer<AppsServiceImpl>>()
            .await;
        health_reporter
            .set_serving::<PermissionsServer<PermissionsServiceImpl>>()
            .await;

        let server_builder = GrpcServerBuilder::new(config.service_name.clone())
            .with_reflection(config.environment == Environment::Dev)
            .with_request_timeout(config.grpc.request_timeout());

        let reflection_service = if server_builder.reflection_enabled() {
            Some(create_reflection_service(&[FILE_DESCRIPTOR_SET]).map_err(|e| {
                std::io::Error::other(format!("Failed to build reflection service: {}", e))
            })?)
        } else {
            None
        };

        let grpc_trace_layer = TraceLayer::new_for_grpc()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG));

        let incoming = tokio_stream::wrappers::TcpListenerStream::new(self.grpc_listener);
        let grpc_server = server_builder
            .build_server()
            .layer(grpc_trace_layer)
            .add_service(grpc_health_service)
            .add_optional_service(reflection_service)
            .add_service(AuthServer::new(AuthServiceImpl::new(self.state.clone())))
            .add_service(AppsServer::new(AppsServiceImpl::new(self.state.clone())))
            .add_service(PermissionsServer::new(PermissionsServiceImpl::new(
                self.state.clone(),
            )))
            .serve_with_incoming_shutdown(incoming, stop.clone().cancelled_owned());

        let http_server = axum::serve(self.http_listener, http_router)
            .with_graceful_shutdown(stop.clone().cancelled_owned());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            http_port = self.http_port,
            grpc_port = self.grpc_port,
            "Service ready to accept connections"
        );

        let http = async {
            let result = http_server.await;
            stop.cancel();
            result.map_err(|e| {
                tracing::error!(error = %e, "HTTP server error");
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
        };

        let grpc = async {
            let result = grpc_server.await;
            stop.cancel();
            result.map_err(|e| {
                tracing::error!(error = %e, "gRPC server error");
                std::io::Error::other(format!("gRPC server error: {}", e))
            })
        };

        let (http_result, grpc_result) = tokio::join!(http, grpc);
        http_result?;
        grpc_result?;

        tracing::info!("Servers stopped");
        Ok(())
    }
}
