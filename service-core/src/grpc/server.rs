//! gRPC server builder utilities.
//!
//! Provides a builder for configuring tonic servers with the workspace's
//! standard transport settings, plus a reflection service helper.

use std::time::Duration;

use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;

/// Builder for configuring a gRPC server with standard transport settings.
#[derive(Debug, Clone)]
pub struct GrpcServerBuilder {
    service_name: String,
    enable_reflection: bool,
    request_timeout: Option<Duration>,
    http2_keepalive_interval: Option<Duration>,
    http2_keepalive_timeout: Option<Duration>,
}

impl GrpcServerBuilder {
    /// Create a new server builder for the given service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            enable_reflection: true,
            request_timeout: None,
            http2_keepalive_interval: Some(Duration::from_secs(30)),
            http2_keepalive_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Enable or disable gRPC reflection (enabled by default).
    pub fn with_reflection(mut self, enable: bool) -> Self {
        self.enable_reflection = enable;
        self
    }

    /// Server-side upper bound for a single request.
    ///
    /// Applied in addition to any client `grpc-timeout`; the shorter one wins.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn reflection_enabled(&self) -> bool {
        self.enable_reflection
    }

    /// Build a tonic Server with the configured settings.
    pub fn build_server(&self) -> Server {
        let mut server = Server::builder()
            .http2_keepalive_interval(self.http2_keepalive_interval)
            .http2_keepalive_timeout(self.http2_keepalive_timeout);

        if let Some(timeout) = self.request_timeout {
            server = server.timeout(timeout);
        }

        tracing::debug!(
            service = %self.service_name,
            reflection = self.enable_reflection,
            request_timeout = ?self.request_timeout,
            "Building gRPC server"
        );

        server
    }
}

/// Create a reflection service from encoded file descriptor sets.
pub fn create_reflection_service(
    file_descriptor_sets: &[&[u8]],
) -> Result<
    tonic_reflection::server::ServerReflectionServer<
        impl tonic_reflection::server::ServerReflection,
    >,
    tonic_reflection::server::Error,
> {
    let mut builder = ReflectionBuilder::configure();

    for fds in file_descriptor_sets {
        builder = builder.register_encoded_file_descriptor_set(fds);
    }

    builder.build_v1()
}
