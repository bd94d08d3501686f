/**
 * Server Configuration
 *
 * This module loads the process configuration once at startup. The result is
 * an explicit `ServerConfig` that is handed to the token codec, the session
 * guard and the governor through `AppState`; nothing downstream reads the
 * environment.
 *
 * # Configuration Sources
 *
 * Environment variables, after an optional `.env` file has been loaded by
 * the binary. `from_lookup` accepts any key lookup so tests never touch the
 * process environment.
 *
 * | Key | Default |
 * |---|---|
 * | `JWT_KEY` | required |
 * | `JWT_ISSUER` | required |
 * | `DATABASE_URL` | none (required by the binary) |
 * | `SERVER_PORT` | 3000 |
 * | `ASSETS_DIR` | `private/assets` |
 * | `RATE_LIMIT_PER_SECOND` | 2 |
 * | `RATE_LIMIT_TTL_SECS` | 3600 |
 * | `SOFT_TIMEOUT_SECS` | 15 |
 * | `HARD_TIMEOUT_SECS` | 20 |
 * | `SECURE_COOKIES` | true |
 * | `BCRYPT_COST` | `bcrypt::DEFAULT_COST` |
 * | `LOG_FILE` | none (log to stdout) |
 */

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Process configuration consumed by the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HMAC signing key for session tokens
    pub jwt_key: Vec<u8>,
    /// Issuer written into and required from every token
    pub jwt_issuer: String,
    /// PostgreSQL connection string
    pub database_url: Option<String>,
    /// Listen port
    pub port: u16,
    /// Root directory for uploaded avatars
    pub assets_dir: PathBuf,
    /// Sustained requests per second per client
    pub rate_per_second: f64,
    /// Idle time after which a client's bucket is forgotten
    pub rate_ttl: Duration,
    /// Deadline handlers react to
    pub soft_timeout: Duration,
    /// Deadline after which the request is cut off regardless
    pub hard_timeout: Duration,
    /// Mark credential cookies `Secure`
    pub secure_cookies: bool,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Append logs to this file instead of stdout
    pub log_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingValue(key))
        };

        let jwt_key = required("JWT_KEY")?.into_bytes();
        let jwt_issuer = required("JWT_ISSUER")?;

        let config = Self {
            jwt_key,
            jwt_issuer,
            database_url: lookup("DATABASE_URL"),
            port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            assets_dir: lookup("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("private/assets")),
            rate_per_second: parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 2.0)?,
            rate_ttl: Duration::from_secs(parse_or(&lookup, "RATE_LIMIT_TTL_SECS", 3600)?),
            soft_timeout: Duration::from_secs(parse_or(&lookup, "SOFT_TIMEOUT_SECS", 15)?),
            hard_timeout: Duration::from_secs(parse_or(&lookup, "HARD_TIMEOUT_SECS", 20)?),
            secure_cookies: parse_or(&lookup, "SECURE_COOKIES", true)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            log_file: lookup("LOG_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_per_second <= 0.0 || !self.rate_per_second.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_PER_SECOND",
                value: self.rate_per_second.to_string(),
            });
        }

        if self.rate_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_TTL_SECS",
                value: "0".to_string(),
            });
        }

        if self.soft_timeout.is_zero() || self.soft_timeout >= self.hard_timeout {
            return Err(ConfigError::InvalidValue {
                key: "SOFT_TIMEOUT_SECS",
                value: format!(
                    "{}s must be non-zero and below the hard timeout of {}s",
                    self.soft_timeout.as_secs(),
                    self.hard_timeout.as_secs()
                ),
            });
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

/// Connect to PostgreSQL and run migrations
///
/// Migration failures are logged and startup continues, since the schema may
/// already be current.
pub async fn load_database(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url).await?;
    tracing::info!("Database connection pool created successfully");

    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!("Failed to run database migrations: {}", e);
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }

    Ok(pool)
}
