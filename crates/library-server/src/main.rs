//! Library Server
//!
//! REST service for user accounts and a book catalogue. Stores data in
//! PostgreSQL, or in process memory when the database cannot be reached at
//! startup.

mod config;
mod extractors;
mod handlers;
mod routes;
mod services;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use library_core::ports::Repository;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{AuthSettings, Cli, Settings};
use services::{BookService, DeletionCounter, RetentionSweeper, TokenService, UserService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub books: Arc<BookService>,
    pub tokens: Arc<TokenService>,
    pub deletions: Arc<DeletionCounter>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        auth: &AuthSettings,
        deletions: Arc<DeletionCounter>,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(repo.clone())),
            books: Arc::new(BookService::new(repo)),
            tokens: Arc::new(TokenService::new(auth)),
            deletions,
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let cli = Cli::parse();

    // Flags are known before the config files are read, so `--debug` and
    // `LIBRARY_DEBUG` both count here
    let debug = cli.debug || std::env::var("LIBRARY_DEBUG").is_ok_and(|v| v == "true");
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Library Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server(cli).await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server(cli: Cli) -> Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let settings = Settings::load(&cli).context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, debug={}",
        settings.bind_address(),
        settings.debug
    );

    // Storage
    info!("Opening storage backend...");
    let backend = storage::open_backend(&settings.database).await;
    info!("Storage backend: {}", backend.repository.backend());

    // Services
    info!("Initializing services...");
    let deletions = Arc::new(DeletionCounter::new(settings.sweeper.capacity));
    let state = AppState::new(backend.repository.clone(), &settings.auth, deletions.clone());
    info!("Services initialized");

    let shutdown = CancellationToken::new();
    let sweeper = RetentionSweeper::new(state.books.clone(), deletions, &settings.sweeper)
        .spawn(shutdown.clone());

    // Build router
    info!("Building HTTP router...");
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server ready to accept connections");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    info!("Shutting down...");
    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!("Retention sweeper ended abnormally: {}", e);
    }
    if let Some(pg) = backend.postgres {
        pg.close().await;
        info!("PostgreSQL pool closed");
    }

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
