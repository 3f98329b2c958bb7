use bookshelf_config::shared::{IntoConnectOptions, PgConnectionConfig};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

/// Creates the API connection pool without opening a connection.
///
/// Connections are established on first use, so the service starts even when the
/// database is briefly unavailable. Acquiring a connection and every statement are
/// bounded by the same operation timeout that wraps every store call.
pub fn connect_pool(config: &PgConnectionConfig) -> PgPool {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        max_connections = config.pool.max_connections,
        "creating lazy postgres pool"
    );

    PgPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .acquire_timeout(config.pool.operation_timeout())
        .connect_lazy_with(config.with_db(Some(&config.pool.connection_options())))
}
