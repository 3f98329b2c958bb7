use serde::Deserialize;

use crate::SerializableSecretString;

/// Sentry error reporting settings. Reporting is disabled when this section is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SentryConfig {
    pub dsn: SerializableSecretString,
}
