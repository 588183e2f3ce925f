//! gRPC module for identity-service.

mod apps_service;
mod auth_service;
mod permissions_service;

pub use apps_service::AppsServiceImpl;
pub use auth_service::AuthServiceImpl;
pub use permissions_service::PermissionsServiceImpl;

use std::time::Duration;

use service_core::error::AppError;
use service_core::grpc::{timeout_from_metadata, IntoStatus};
use tokio_util::sync::DropGuard;
use tonic::{Request, Status};

use crate::config::GrpcConfig;
use crate::services::{CallContext, ServiceError};

/// How far ahead of the transport timer the call context expires. The
/// transport drops the handler and answers CANCELLED when its timer fires
/// first.
const DEADLINE_HEADROOM: Duration = Duration::from_millis(25);

/// Generated protobuf code.
pub mod proto {
    tonic::include_proto!("sso.v1");

    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("sso_descriptor");
}

/// Context for one RPC, cancelled when the returned guard drops with the
/// handler future.
///
/// The deadline is the shorter of the client's `grpc-timeout` and the server
/// request timeout, less [`DEADLINE_HEADROOM`].
pub(crate) fn call_context<T>(
    request: &Request<T>,
    grpc: &GrpcConfig,
) -> (CallContext, DropGuard) {
    let budget = rpc_budget(timeout_from_metadata(request.metadata()), grpc.request_timeout());
    CallContext::cancel_on_drop(Some(budget))
}

fn rpc_budget(client: Option<Duration>, server: Duration) -> Duration {
    client
        .map_or(server, |client| client.min(server))
        .saturating_sub(DEADLINE_HEADROOM)
}

pub(crate) fn to_status(rpc: &'static str, err: ServiceError) -> Status {
    if err.is_client_error() {
        tracing::info!(rpc, error = %err, "Request rejected");
    } else {
        tracing::error!(rpc, error = %err, "Request failed");
    }
    AppError::from(err).into_status()
}

pub(crate) fn require_key(key: &[u8], name: &str) -> Result<(), Status> {
    if key.is_empty() {
        return Err(Status::invalid_argument(format!("{} is required", name)));
    }
    Ok(())
}

pub(crate) fn require(value: &str, name: &str) -> Result<(), Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(format!("{} is required", name)));
    }
    Ok(())
}
