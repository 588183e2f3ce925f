//! User model - credentials scoped to one app.

use sqlx::FromRow;
use std::fmt;

/// User entity. `(app_id, login)` is unique; the same login may exist in other apps.
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub app_id: i32,
    pub login: String,
    pub password_hash: Vec<u8>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("app_id", &self.app_id)
            .field("login", &self.login)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}
