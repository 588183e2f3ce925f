//! Domain records persisted by the identity stores.

mod app;
mod permission;
mod user;

pub use app::{key_fingerprint, App};
pub use permission::Permission;
pub use user::User;
