use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::{App, User};
use crate::services::ServiceError;

/// Issues and verifies HS256 tokens signed with the issuing app's secret key.
#[derive(Debug, Clone)]
pub struct TokenService {
    ttl: Duration,
}

/// Claims carried by a login token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User ID
    pub uid: i64,
    pub login: String,
    /// App the user belongs to
    pub app_id: i32,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenService {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user`, keyed by `app.key`.
    pub fn issue(&self, user: &User, app: &App) -> Result<String, ServiceError> {
        let expires_at = Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("Token expiry out of range"))
        })?;

        let claims = TokenClaims {
            uid: user.id,
            login: user.login.clone(),
            app_id: app.id,
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&app.key),
        )
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Verify `token` against `key` and return its claims.
    pub fn validate(&self, token: &str, key: &[u8]) -> Result<TokenClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        decode::<TokenClaims>(token, &DecodingKey::from_secret(key), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => ServiceError::InvalidSignature,
                ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                _ => ServiceError::InvalidToken(e.to_string()),
            })
    }
}
