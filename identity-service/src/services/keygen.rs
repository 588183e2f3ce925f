//! Secret key generation for new apps.

use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Produces an opaque key used as both an app handle and its HMAC secret.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Vec<u8>;
}

/// Hex-encoded SHA-256 of the current wall-clock time in nanoseconds.
///
/// Clock reads are serialized per instance and never repeat a previous
/// reading, so one instance cannot hand out the same key twice. Separate
/// instances (or processes) offer no such guarantee.
#[derive(Debug, Default)]
pub struct TimestampKeyGenerator {
    last: Mutex<u128>,
}

impl TimestampKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_nanos(&self) -> u128 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        match self.last.lock() {
            Ok(mut last) => {
                let next = if now > *last { now } else { *last + 1 };
                *last = next;
                next
            }
            // A poisoned lock only means another generate() panicked mid-update.
            Err(poisoned) => {
                let mut last = poisoned.into_inner();
                let next = now.max(*last + 1);
                *last = next;
                next
            }
        }
    }
}

impl KeyGenerator for TimestampKeyGenerator {
    fn generate(&self) -> Vec<u8> {
        let nanos = self.next_nanos();
        let digest = Sha256::digest(nanos.to_string().as_bytes());
        hex::encode(digest).into_bytes()
    }
}

/// Hex-encoded SHA-256 of 32 bytes from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> Vec<u8> {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        hex::encode(Sha256::digest(seed)).into_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyGeneratorKind {
    Timestamp,
    Random,
}

impl KeyGeneratorKind {
    pub fn build(self) -> Box<dyn KeyGenerator> {
        match self {
            KeyGeneratorKind::Timestamp => Box::new(TimestampKeyGenerator::new()),
            KeyGeneratorKind::Random => Box::new(RandomKeyGenerator),
        }
    }
}

impl FromStr for KeyGeneratorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timestamp" => Ok(KeyGeneratorKind::Timestamp),
            "random" => Ok(KeyGeneratorKind::Random),
            other => Err(anyhow::anyhow!(
                "Unknown key generator '{}', expected 'timestamp' or 'random'",
                other
            )),
        }
    }
}
