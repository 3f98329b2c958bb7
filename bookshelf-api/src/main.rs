use std::env;

use anyhow::{Context, bail};
use bookshelf_api::{config::ApiConfig, startup::Application};
use bookshelf_config::{load_config, shared::PgConnectionConfig};
use bookshelf_telemetry::tracing::init_tracing;
use tracing::{error, info};

mod sentry;

/// What the binary was asked to do.
enum Command {
    Serve,
    Migrate,
}

impl Command {
    fn from_args(args: &[String]) -> anyhow::Result<Self> {
        match args {
            [_] => Ok(Command::Serve),
            [_, command] if command == "migrate" => Ok(Command::Migrate),
            [_, command] => {
                error!(%command, "invalid command");
                bail!("invalid command: {command}")
            }
            _ => {
                error!("invalid number of command line arguments");
                bail!("invalid number of command line arguments")
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let args: Vec<String> = env::args().collect();
    let command = Command::from_args(&args)?;

    let config = load_config::<ApiConfig>().context("loading API configuration")?;
    log_pg_connection_config(&config.database);

    // Sentry has to be up before the runtime starts to see panics on every thread.
    let _sentry_guard = sentry::init(config.sentry.as_ref())?;

    actix_web::rt::System::new().block_on(async move {
        match command {
            Command::Serve => {
                let application = Application::build(config).await?;
                application.run_until_stopped().await
            }
            Command::Migrate => {
                Application::migrate_database(config.database).await?;
                info!("database migrated successfully");
                Ok(())
            }
        }
    })
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    info!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        max_connections = config.pool.max_connections,
        "pg database options",
    );
}
