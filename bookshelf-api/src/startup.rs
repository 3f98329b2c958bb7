use std::net::TcpListener;
use std::pin::pin;
use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, web};
use actix_web_httpauth::middleware::HttpAuthentication;
use bookshelf_config::shared::PgConnectionConfig;
use bookshelf_postgres::pool::connect_pool;
use bookshelf_telemetry::metrics::init_metrics_handle;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;

use crate::auth::TokenIssuer;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::config::{ApiConfig, AuthConfig, DeletionConfig};
use crate::deletion::{DeletionBatcherHandle, deletion_batcher};
use crate::session::{SessionError, SessionService};
use crate::store::Store;
use crate::store::postgres::PostgresStore;
use crate::{
    authentication::auth_validator,
    routes::{
        ErrorMessage,
        auth::{LoginRequest, RegisterRequest, RegisterResponse, TokenResponse, login, register},
        books::{
            CreateBookRequest, CreateBookResponse, CreateBooksRequest, CreateBooksResponse,
            ReadBookResponse, ReadBooksResponse, create_book, create_books, delete_book,
            read_all_books, read_my_books,
        },
        health_check::health_check,
        metrics::metrics,
        openapi::openapi_json,
        users::{
            ReadUserResponse, ReadUsersResponse, UpdateUserRequest, delete_user, read_all_users,
            read_user, update_user,
        },
    },
};

/// Bookshelf API application server wrapper.
///
/// Owns the HTTP server together with the deletion batcher that runs next to it.
pub struct Application {
    port: u16,
    server: Server,
    batcher: DeletionBatcherHandle,
    shutdown_tx: ShutdownTx,
}

impl Application {
    /// Builds the API application against the configured Postgres database.
    pub async fn build(config: ApiConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let connection_pool = connect_pool(&config.database);
        let store = PostgresStore::new(connection_pool, config.database.pool.operation_timeout());

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;

        Self::start(listener, Arc::new(store), &config.auth, config.deletion).await
    }

    /// Starts the deletion batcher and the HTTP server on `listener` over `store`.
    pub async fn start(
        listener: TcpListener,
        store: Arc<dyn Store>,
        auth: &AuthConfig,
        deletion: DeletionConfig,
    ) -> anyhow::Result<Self> {
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let (deletions, batcher) = deletion_batcher(store.clone(), deletion, shutdown_rx);
        let batcher = batcher.start();

        let tokens = TokenIssuer::new(auth.signing_key.expose_secret().as_bytes(), auth.token_ttl());
        let session = SessionService::new(store, tokens, deletions, auth.password_hash_cost);

        let server = match run(listener, session).await {
            Ok(server) => server,
            Err(err) => {
                shutdown_tx.shutdown();
                return Err(err);
            }
        };

        info!(port, "bookshelf api started");

        Ok(Self {
            port,
            server,
            batcher,
            shutdown_tx,
        })
    }

    /// Runs database migrations using the provided configuration.
    ///
    /// Applies all pending SQLx migrations from the migrations directory.
    pub async fn migrate_database(config: PgConnectionConfig) -> Result<(), anyhow::Error> {
        let connection_pool = connect_pool(&config);

        sqlx::migrate!("./migrations").run(&connection_pool).await?;

        Ok(())
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Runs the server until it stops or the deletion batcher fails.
    ///
    /// A batch that cannot be committed stops the server and is returned as an error.
    /// When the server stops on its own the batcher is shut down and awaited.
    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        let Self {
            server,
            batcher,
            shutdown_tx,
            ..
        } = self;

        let server_handle = server.handle();
        let mut server = pin!(server);
        let mut batcher = pin!(batcher.wait());

        tokio::select! {
            result = &mut server => {
                info!("http server stopped, shutting down deletion batcher");
                shutdown_tx.shutdown();
                batcher.await?;
                result?;
            }
            result = &mut batcher => {
                if let Err(err) = result {
                    error!(error = %err, "deletion batcher failed, stopping http server");
                    // The stop command is only processed while the server future is polled.
                    let (_, server_result) = tokio::join!(server_handle.stop(false), &mut server);
                    if let Err(server_err) = server_result {
                        warn!(error = %server_err, "http server failed while stopping");
                    }
                    return Err(err.into());
                }
                server.await?;
            }
        }

        Ok(())
    }
}

/// Creates and configures the HTTP server with all routes and middleware.
pub async fn run(listener: TcpListener, session: SessionService) -> Result<Server, anyhow::Error> {
    let prometheus_handle = web::ThinData(init_metrics_handle()?);
    let session = web::Data::new(session);

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::routes::health_check::health_check,
            crate::routes::metrics::metrics,
        ),
        components(schemas(
            ErrorMessage,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            TokenResponse,
            ReadUserResponse,
            ReadUsersResponse,
            UpdateUserRequest,
            CreateBookRequest,
            CreateBookResponse,
            CreateBooksRequest,
            CreateBooksResponse,
            ReadBookResponse,
            ReadBooksResponse,
        )),
        nest(
            (path = "/v1/auth", api = AuthApi),
            (path = "/v1", api = ApiV1)
        )
    )]
    struct ApiDoc;

    #[derive(OpenApi)]
    #[openapi(paths(crate::routes::auth::register, crate::routes::auth::login))]
    struct AuthApi;

    #[derive(OpenApi)]
    #[openapi(paths(
        crate::routes::users::read_all_users,
        crate::routes::users::read_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
        crate::routes::books::read_all_books,
        crate::routes::books::read_my_books,
        crate::routes::books::create_book,
        crate::routes::books::create_books,
        crate::routes::books::delete_book,
    ))]
    struct ApiV1;

    let openapi = web::Data::new(ApiDoc::openapi());

    let server = HttpServer::new(move || {
        let tracing_logger = TracingLogger::default();
        let authentication = HttpAuthentication::bearer(auth_validator);
        App::new()
            .wrap(tracing_logger)
            .wrap(
                sentry::integrations::actix::Sentry::builder()
                    .capture_server_errors(true)
                    .start_transaction(true)
                    .finish(),
            )
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                SessionError::Validation(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                SessionError::Validation(err.to_string()).into()
            }))
            .service(health_check)
            .service(metrics)
            .service(openapi_json)
            .service(web::scope("v1/auth").service(register).service(login))
            .service(
                web::scope("v1")
                    .wrap(authentication)
                    // users
                    .service(read_all_users)
                    .service(read_user)
                    .service(update_user)
                    .service(delete_user)
                    // books
                    .service(read_my_books)
                    .service(read_all_books)
                    .service(create_books)
                    .service(create_book)
                    .service(delete_book),
            )
            .app_data(prometheus_handle.clone())
            .app_data(openapi.clone())
            .app_data(session.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
