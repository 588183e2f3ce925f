//! App model - a tenant identified by its secret key.

use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::fmt;

/// App (tenant) entity.
///
/// `key` is both the tenant's external handle and its token signing secret,
/// so it never appears in `Debug` output or logs; use [`App::fingerprint`].
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct App {
    pub id: i32,
    #[sqlx(rename = "secret_key")]
    pub key: Vec<u8>,
}

impl App {
    pub fn new(id: i32, key: Vec<u8>) -> Self {
        Self { id, key }
    }

    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.key)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("key", &self.fingerprint())
            .finish()
    }
}

/// Short, non-reversible identifier of a secret key for log correlation.
pub fn key_fingerprint(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    hex::encode(&digest[..4])
}
