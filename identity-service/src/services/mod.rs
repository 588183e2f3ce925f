pub mod apps;
pub mod auth;
pub mod context;
pub mod database;
pub mod error;
pub mod jwt;
pub mod keygen;
pub mod memory;
pub mod permissions;
pub mod store;

pub use apps::AppRegistry;
pub use auth::AuthService;
pub use context::CallContext;
pub use database::Database;
pub use error::{ServiceError, StoreError};
pub use jwt::{TokenClaims, TokenService};
pub use keygen::{KeyGenerator, KeyGeneratorKind, RandomKeyGenerator, TimestampKeyGenerator};
pub use memory::MemoryStore;
pub use permissions::{PermissionCascade, PermissionService};
pub use store::{AppStore, PermissionStore, UserStore};
