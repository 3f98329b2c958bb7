use std::fmt;
use std::time::Duration;

use bookshelf_config::shared::{PgConnectionConfig, SentryConfig, ValidationError};
use bookshelf_config::{Config, SerializableSecretString};
use serde::Deserialize;

/// Shortest signing key accepted for HS256 tokens, in bytes.
const MIN_SIGNING_KEY_LENGTH: usize = 32;

/// Range of bcrypt work factors accepted by the hashing library.
const MIN_PASSWORD_HASH_COST: u32 = 4;
const MAX_PASSWORD_HASH_COST: u32 = 31;

/// Complete configuration of the bookshelf API service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Database holding users and books.
    pub database: PgConnectionConfig,
    pub application: ApplicationSettings,
    pub auth: AuthConfig,
    #[serde(default)]
    pub deletion: DeletionConfig,
    /// Error reporting is disabled when absent.
    pub sentry: Option<SentryConfig>,
}

impl Config for ApiConfig {}

impl ApiConfig {
    /// Checks cross-field constraints once, before the service starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.auth.validate()?;
        self.deletion.validate()
    }
}

/// HTTP server configuration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    /// Host address the API listens on.
    pub host: String,
    /// Port number the API listens on.
    pub port: u16,
}

impl fmt::Display for ApplicationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    host: {}", self.host)?;
        writeln!(f, "    port: {}", self.port)
    }
}

/// Token signing and password hashing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign and verify HS256 tokens.
    pub signing_key: SerializableSecretString,
    /// Lifetime of issued tokens in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// bcrypt work factor.
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

impl AuthConfig {
    /// Three hours.
    pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3 * 60 * 60;
    pub const DEFAULT_PASSWORD_HASH_COST: u32 = 12;

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.signing_key.expose_secret().len() < MIN_SIGNING_KEY_LENGTH {
            return Err(ValidationError::invalid(
                "auth.signing_key",
                format!("must be at least {MIN_SIGNING_KEY_LENGTH} bytes long"),
            ));
        }
        if self.token_ttl_secs == 0 {
            return Err(ValidationError::invalid(
                "auth.token_ttl_secs",
                "must be greater than 0",
            ));
        }
        if !(MIN_PASSWORD_HASH_COST..=MAX_PASSWORD_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ValidationError::invalid(
                "auth.password_hash_cost",
                format!(
                    "must be between {MIN_PASSWORD_HASH_COST} and {MAX_PASSWORD_HASH_COST}"
                ),
            ));
        }

        Ok(())
    }
}

fn default_token_ttl_secs() -> u64 {
    AuthConfig::DEFAULT_TOKEN_TTL_SECS
}

fn default_password_hash_cost() -> u32 {
    AuthConfig::DEFAULT_PASSWORD_HASH_COST
}

/// Settings of the background deletion batcher.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletionConfig {
    /// Number of queued deletions committed together. Also the queue capacity.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Attempts made to commit one batch before the batcher gives up.
    #[serde(default = "default_max_flush_attempts")]
    pub max_flush_attempts: u32,
    /// Backoff after the first failed attempt, doubled after each further failure.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Random spread applied to each backoff, in percent (0-100).
    #[serde(default = "default_jitter_percent")]
    pub jitter_percent: u8,
}

impl DeletionConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 5;
    pub const DEFAULT_MAX_FLUSH_ATTEMPTS: u32 = 5;
    pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
    pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;
    pub const DEFAULT_JITTER_PERCENT: u8 = 25;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::invalid(
                "deletion.batch_size",
                "must be greater than 0",
            ));
        }
        if self.max_flush_attempts == 0 {
            return Err(ValidationError::invalid(
                "deletion.max_flush_attempts",
                "must be greater than 0",
            ));
        }
        if self.jitter_percent > 100 {
            return Err(ValidationError::invalid(
                "deletion.jitter_percent",
                "must be <= 100",
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ValidationError::invalid(
                "deletion.initial_backoff_ms",
                "must be <= max_backoff_ms",
            ));
        }

        Ok(())
    }
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_flush_attempts: Self::DEFAULT_MAX_FLUSH_ATTEMPTS,
            initial_backoff_ms: Self::DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: Self::DEFAULT_MAX_BACKOFF_MS,
            jitter_percent: Self::DEFAULT_JITTER_PERCENT,
        }
    }
}

fn default_batch_size() -> usize {
    DeletionConfig::DEFAULT_BATCH_SIZE
}

fn default_max_flush_attempts() -> u32 {
    DeletionConfig::DEFAULT_MAX_FLUSH_ATTEMPTS
}

fn default_initial_backoff_ms() -> u64 {
    DeletionConfig::DEFAULT_INITIAL_BACKOFF_MS
}

fn default_max_backoff_ms() -> u64 {
    DeletionConfig::DEFAULT_MAX_BACKOFF_MS
}

fn default_jitter_percent() -> u8 {
    DeletionConfig::DEFAULT_JITTER_PERCENT
}
