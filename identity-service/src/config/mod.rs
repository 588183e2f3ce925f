use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::KeyGeneratorKind;
use crate::utils::PasswordCost;

/// Ten years.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageConfig,
    pub token: TokenConfig,
    pub password: PasswordCost,
    pub keys: KeyConfig,
    pub security: SecurityConfig,
    pub grpc: GrpcConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct KeyConfig {
    pub generator: KeyGeneratorKind,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// When set, admin HTTP routes require a matching `x-admin-api-key` header.
    pub admin_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GrpcConfig {
    pub request_timeout_seconds: u64,
}

impl GrpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl TokenConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.ttl_seconds).unwrap_or(chrono::Duration::MAX)
    }
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let backend: StorageBackend = get_env("STORAGE_BACKEND", Some("postgres"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database_url = match backend {
            StorageBackend::Postgres => Some(get_env("DATABASE_URL", None, is_prod)?),
            StorageBackend::Memory => env::var("DATABASE_URL").ok(),
        };

        let defaults = PasswordCost::default();

        let config = IdentityConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("identity-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            storage: StorageConfig {
                backend,
                database_url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            token: TokenConfig {
                ttl_seconds: parse_env("TOKEN_TTL_SECONDS", "3600", is_prod)?,
            },
            password: PasswordCost {
                memory_kib: parse_env(
                    "PASSWORD_HASH_MEMORY_KIB",
                    &defaults.memory_kib.to_string(),
                    is_prod,
                )?,
                iterations: parse_env(
                    "PASSWORD_HASH_ITERATIONS",
                    &defaults.iterations.to_string(),
                    is_prod,
                )?,
                parallelism: parse_env(
                    "PASSWORD_HASH_PARALLELISM",
                    &defaults.parallelism.to_string(),
                    is_prod,
                )?,
            },
            keys: KeyConfig {
                generator: get_env("KEY_GENERATOR", Some("timestamp"), is_prod)?
                    .parse()
                    .map_err(AppError::ConfigError)?,
                max_attempts: parse_env("KEY_GENERATION_ATTEMPTS", "3", is_prod)?,
            },
            security: SecurityConfig {
                admin_api_key: if is_prod {
                    Some(get_env("ADMIN_API_KEY", None, true)?)
                } else {
                    env::var("ADMIN_API_KEY").ok().filter(|s| !s.is_empty())
                },
            },
            grpc: GrpcConfig {
                request_timeout_seconds: parse_env("GRPC_REQUEST_TIMEOUT_SECONDS", "30", is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 || self.common.grpc_addr().port() == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT and GRPC_PORT must be greater than 0"
            )));
        }

        if self.token.ttl_seconds <= 0 || self.token.ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_TTL_SECONDS must be between 1 and {}",
                MAX_TOKEN_TTL_SECONDS
            )));
        }

        if self.keys.max_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "KEY_GENERATION_ATTEMPTS must be at least 1"
            )));
        }

        if self.grpc.request_timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GRPC_REQUEST_TIMEOUT_SECONDS must be positive"
            )));
        }

        self.password
            .validate()
            .map_err(AppError::ConfigError)?;

        if self.environment == Environment::Prod {
            if self.storage.backend == StorageBackend::Memory {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "STORAGE_BACKEND=memory is not allowed in production"
                )));
            }
            if self.security.admin_api_key.is_none() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "ADMIN_API_KEY is required in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}
