//! gRPC utilities shared by the workspace services.
//!
//! - Error conversion from `AppError` to `tonic::Status`
//! - Client deadline extraction from `grpc-timeout` metadata
//! - Server builder and reflection helper

pub mod deadline;
pub mod error;
pub mod server;

pub use deadline::{GRPC_TIMEOUT_KEY, parse_grpc_timeout, timeout_from_metadata};
pub use error::IntoStatus;
pub use server::{GrpcServerBuilder, create_reflection_service};
