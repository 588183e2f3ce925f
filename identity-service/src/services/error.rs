use service_core::error::AppError;
use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate
            }
            other => StoreError::Backend(anyhow::Error::new(other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("App not found")]
    AppNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Permission not found")]
    PermissionNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Storage failure in {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl ServiceError {
    /// Wrap a storage failure with the identity of the operation that issued it.
    pub fn storage(op: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
        move |source| ServiceError::Storage { op, source }
    }

    /// True for failures the caller caused (bad input, credentials, tokens).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidArgument(_)
                | ServiceError::UserAlreadyExists
                | ServiceError::InvalidCredentials
                | ServiceError::InvalidSignature
                | ServiceError::TokenExpired
                | ServiceError::InvalidToken(_)
        )
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidArgument(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::UserAlreadyExists => {
                AppError::Conflict(anyhow::anyhow!("user already exists"))
            }
            ServiceError::InvalidCredentials => {
                AppError::BadRequest(anyhow::anyhow!("invalid login or password"))
            }
            ServiceError::InvalidSignature => {
                AppError::Unauthorized(anyhow::anyhow!("token signature is invalid"))
            }
            ServiceError::TokenExpired => AppError::Unauthorized(anyhow::anyhow!("token expired")),
            ServiceError::InvalidToken(msg) => {
                AppError::Unauthorized(anyhow::anyhow!("invalid token: {}", msg))
            }
            ServiceError::AppNotFound => AppError::InternalError(anyhow::anyhow!("app not found")),
            ServiceError::UserNotFound => {
                AppError::InternalError(anyhow::anyhow!("user not found"))
            }
            ServiceError::PermissionNotFound => {
                AppError::InternalError(anyhow::anyhow!("permission not found"))
            }
            ServiceError::Storage { op, source } => {
                AppError::DatabaseError(anyhow::anyhow!("{}: {}", op, source))
            }
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Cancelled => AppError::Cancelled,
            ServiceError::DeadlineExceeded => AppError::DeadlineExceeded,
        }
    }
}
