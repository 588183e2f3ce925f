use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::fmt;

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Argon2id cost parameters. Higher values make each hash slower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordCost {
    /// Cheapest parameters argon2 accepts. Test use only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST.max(8 * Params::MIN_P_COST),
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, anyhow::Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid password hash parameters: {}", e))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.argon2().map(|_| ())
    }
}

/// Hash a password using Argon2id.
///
/// Salt is generated per call and embedded, together with the cost
/// parameters, in the returned PHC string.
pub fn hash_password(password: &Password, cost: &PasswordCost) -> Result<Vec<u8>, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = cost
        .argon2()?
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash.into_bytes())
}

/// Check a password against a stored hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash is
/// unreadable. The comparison is constant-time; cost parameters are taken
/// from the stored hash, so hashes made under an older cost still verify.
pub fn verify_password(password: &Password, password_hash: &[u8]) -> Result<bool, anyhow::Error> {
    let encoded = std::str::from_utf8(password_hash)
        .map_err(|e| anyhow::anyhow!("Password hash is not UTF-8: {}", e))?;
    let parsed_hash = PasswordHash::new(encoded)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    match Argon2::default().verify_password(password.as_str().as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}
