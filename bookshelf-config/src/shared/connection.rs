use std::sync::LazyLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

const APP_NAME_API: &str = "bookshelf_api";

/// Session settings applied to every connection opened by the API.
///
/// `statement_timeout` holds the default operation timeout. Pools take their options
/// from [`PgPoolConfig::connection_options`], which replaces it with the configured one.
pub static BOOKSHELF_API_OPTIONS: LazyLock<PgConnectionOptions> =
    LazyLock::new(|| PgConnectionOptions {
        datestyle: "ISO".to_string(),
        client_encoding: "UTF8".to_string(),
        timezone: "UTC".to_string(),
        statement_timeout: 5_000,
        lock_timeout: 5_000,
        idle_in_transaction_session_timeout: 30_000,
        application_name: APP_NAME_API.to_string(),
    });

/// Postgres runtime parameters sent at connection startup.
#[derive(Debug, Clone)]
pub struct PgConnectionOptions {
    pub datestyle: String,
    pub client_encoding: String,
    pub timezone: String,
    /// Milliseconds, `0` disables the timeout.
    pub statement_timeout: u32,
    pub lock_timeout: u32,
    pub idle_in_transaction_session_timeout: u32,
    pub application_name: String,
}

impl PgConnectionOptions {
    pub fn to_key_value_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("datestyle".to_string(), self.datestyle.clone()),
            ("client_encoding".to_string(), self.client_encoding.clone()),
            ("timezone".to_string(), self.timezone.clone()),
            (
                "statement_timeout".to_string(),
                self.statement_timeout.to_string(),
            ),
            ("lock_timeout".to_string(), self.lock_timeout.to_string()),
            (
                "idle_in_transaction_session_timeout".to_string(),
                self.idle_in_transaction_session_timeout.to_string(),
            ),
            (
                "application_name".to_string(),
                self.application_name.clone(),
            ),
        ]
    }
}

/// Connection settings for a Postgres database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SerializableSecretString>,
    pub tls: TlsConfig,
    #[serde(default)]
    pub pool: PgPoolConfig,
}

impl crate::Config for PgConnectionConfig {}

impl PgConnectionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.tls.validate()?;
        self.pool.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM encoded root certificates trusted when `enabled` is set.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Sizing and timeouts of the shared connection pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgPoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound, in milliseconds, for a single store operation including
    /// waiting for a free connection.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl PgPoolConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// API session settings with the statement timeout set to the operation timeout,
    /// so a query outliving its store call is cancelled server side as well.
    pub fn connection_options(&self) -> PgConnectionOptions {
        PgConnectionOptions {
            statement_timeout: u32::try_from(self.operation_timeout_ms).unwrap_or(u32::MAX),
            ..BOOKSHELF_API_OPTIONS.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_connections == 0 {
            return Err(ValidationError::invalid(
                "database.pool.max_connections",
                "must be greater than 0",
            ));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ValidationError::invalid(
                "database.pool.operation_timeout_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for PgPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

fn default_max_connections() -> u32 {
    PgPoolConfig::DEFAULT_MAX_CONNECTIONS
}

fn default_operation_timeout_ms() -> u64 {
    PgPoolConfig::DEFAULT_OPERATION_TIMEOUT_MS
}

/// Builds driver specific connect options out of a [`PgConnectionConfig`].
pub trait IntoConnectOptions<Output> {
    /// Options for the server itself, used for administrative work such as creating databases.
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> Output;

    /// Options for the configured database.
    fn with_db(&self, options: Option<&PgConnectionOptions>) -> Output;
}

impl IntoConnectOptions<PgConnectOptions> for PgConnectionConfig {
    fn without_db(&self, options: Option<&PgConnectionOptions>) -> PgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            PgSslMode::VerifyFull
        } else {
            PgSslMode::Prefer
        };
        let mut connect_options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .ssl_mode(ssl_mode);

        if self.tls.enabled {
            connect_options = connect_options
                .ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());
        }

        if let Some(password) = &self.password {
            connect_options = connect_options.password(password.expose_secret());
        }

        if let Some(options) = options {
            connect_options = connect_options.options(options.to_key_value_pairs());
        }

        connect_options
    }

    fn with_db(&self, options: Option<&PgConnectionOptions>) -> PgConnectOptions {
        let connect_options: PgConnectOptions = self.without_db(options);
        connect_options.database(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_options_carry_statement_timeout() {
        let pairs = BOOKSHELF_API_OPTIONS.to_key_value_pairs();

        assert!(pairs.contains(&("statement_timeout".to_string(), "5000".to_string())));
        assert!(pairs.contains(&("application_name".to_string(), "bookshelf_api".to_string())));
    }

    #[test]
    fn statement_timeout_follows_operation_timeout() {
        let pool = PgPoolConfig {
            operation_timeout_ms: 12_000,
            ..PgPoolConfig::default()
        };
        let pairs = pool.connection_options().to_key_value_pairs();

        assert!(pairs.contains(&("statement_timeout".to_string(), "12000".to_string())));
        assert!(pairs.contains(&("lock_timeout".to_string(), "5000".to_string())));
        assert!(pairs.contains(&("application_name".to_string(), "bookshelf_api".to_string())));

        let pool = PgPoolConfig {
            operation_timeout_ms: u64::MAX,
            ..PgPoolConfig::default()
        };
        assert_eq!(pool.connection_options().statement_timeout, u32::MAX);
    }

    #[test]
    fn pool_defaults_apply_when_section_is_missing() {
        let config: PgConnectionConfig = serde_json::from_str(
            r#"{
                "host": "localhost",
                "port": 5432,
                "name": "bookshelf",
                "username": "postgres",
                "password": null,
                "tls": { "trusted_root_certs": "", "enabled": false }
            }"#,
        )
        .unwrap();

        assert_eq!(config.pool.max_connections, 10);
        assert_eq!(config.pool.operation_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tls_without_certificates_is_rejected() {
        let tls = TlsConfig {
            trusted_root_certs: String::new(),
            enabled: true,
        };

        assert!(matches!(
            tls.validate(),
            Err(ValidationError::MissingTrustedRootCerts)
        ));
    }

    #[test]
    fn zero_sized_pool_is_rejected() {
        let pool = PgPoolConfig {
            max_connections: 0,
            ..PgPoolConfig::default()
        };

        assert!(pool.validate().is_err());
    }
}
