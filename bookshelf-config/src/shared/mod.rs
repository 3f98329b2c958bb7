//! Configuration types shared between the bookshelf binaries and their tests.

mod base;
mod connection;
mod sentry;

pub use base::ValidationError;
pub use connection::{
    BOOKSHELF_API_OPTIONS, IntoConnectOptions, PgConnectionConfig, PgConnectionOptions,
    PgPoolConfig, TlsConfig,
};
pub use sentry::SentryConfig;
