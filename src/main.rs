use std::{process, sync::Arc};

use bookshelf::{
    application::{
        authors::AuthorService,
        books::{BookCatalog, BookService},
        error::AppError,
        files::ImageStore,
        repos::{AuthorsRepo, BooksRepo, BooksWriteRepo},
    },
    cache::{CacheConfig, build_cache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        memory::InMemoryRepositories,
        telemetry,
        uploads::UploadStorage,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    connect_database(database_url, &settings).await?;
    info!(target = "bookshelf::migrate", "migrations applied");
    Ok(())
}

async fn connect_database(
    database_url: &str,
    settings: &config::Settings,
) -> Result<PostgresRepositories, AppError> {
    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(PostgresRepositories::new(pool))
}

struct Repositories {
    books: Arc<dyn BooksRepo>,
    books_write: Arc<dyn BooksWriteRepo>,
    authors: Arc<dyn AuthorsRepo>,
    db: Option<PostgresRepositories>,
}

async fn init_repositories(settings: &config::Settings) -> Result<Repositories, AppError> {
    match settings.database.url.as_deref() {
        Some(url) => {
            let repositories = connect_database(url, settings).await?;
            let shared = Arc::new(repositories.clone());
            Ok(Repositories {
                books: shared.clone(),
                books_write: shared.clone(),
                authors: shared,
                db: Some(repositories),
            })
        }
        None => {
            warn!(
                target = "bookshelf::startup",
                "no database url configured; data is kept in memory and lost on exit"
            );
            let shared = Arc::new(InMemoryRepositories::new());
            Ok(Repositories {
                books: shared.clone(),
                books_write: shared.clone(),
                authors: shared,
                db: None,
            })
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = build_cache(&cache_config);
    let catalog = Arc::new(BookCatalog::new(
        repositories.books,
        repositories.books_write,
        cache,
        cache_config.ttl(),
    ));

    let upload_storage = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::from(err)))?,
    );
    let images: Arc<dyn ImageStore> = upload_storage.clone();

    let books = Arc::new(BookService::new(
        catalog,
        repositories.authors.clone(),
        images,
    ));
    let authors = Arc::new(AuthorService::new(repositories.authors));

    let state = RouterState {
        http: HttpState {
            books: books.clone(),
            authors: authors.clone(),
            upload_storage,
            db: repositories.db,
        },
        api: ApiState { books, authors },
    };

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let body_limit = usize::try_from(settings.uploads.max_request_bytes.get()).unwrap_or(usize::MAX);
    let router = http::build_router(state, body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "bookshelf::startup",
        addr = %settings.server.addr,
        cache_enabled = settings.cache.enabled,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: std::time::Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "bookshelf::shutdown", error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(
        target = "bookshelf::shutdown",
        grace_seconds = grace.as_secs(),
        "shutdown requested; draining connections"
    );
    // Bound the drain so a stuck connection cannot keep the process alive.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "bookshelf::shutdown", "graceful shutdown timed out");
        process::exit(0);
    });
}
