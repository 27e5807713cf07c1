//! orthoplus-split - payment split service
//!
//! Serves split configuration management and split application over HTTP,
//! backed by SQLite. Caller identity arrives in gateway headers.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orthoplus_common::config::{ConfigOverrides, ServiceConfig};
use orthoplus_common::db::init_database;
use orthoplus_common::events::{AuditLogHandler, EventBus};
use orthoplus_split::repository::SqliteSplitRepository;
use orthoplus_split::{build_router, AppState, SERVICE_NAME};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "orthoplus-split")]
#[command(about = "Payment split service for Ortho+")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long, env = "ORTHOPLUS_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "ORTHOPLUS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ORTHOPLUS_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, env = "ORTHOPLUS_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: args.config,
        database_path: args.database,
        host: args.host,
        port: args.port,
        log_level: args.log_level,
    })
    .context("Failed to resolve configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_level))
                .context("Invalid log level")?,
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Ortho+ split service (orthoplus-split) v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &config.config_file {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file, using defaults and overrides"),
    }
    info!("Database path: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let mut events = EventBus::new();
    events.subscribe_all(Arc::new(AuditLogHandler::new(pool.clone())));

    let repository = Arc::new(SqliteSplitRepository::new(pool));
    let state = AppState::new(repository, Arc::new(events));
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("{} listening on http://{}", SERVICE_NAME, addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
