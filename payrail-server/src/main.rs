//! Payrail Server
//!
//! Stablecoin subscription billing: merchant dashboard API, public checkout
//! and portal API, and the vault watcher that activates deposit-vault
//! subscriptions.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url, get_sweeper_key};
use payrail_core::events::vault_created_channel;
use payrail_core::framework::DatabaseProcessor;
use payrail_core::processors::VaultWatcher;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Payrail - Stablecoin subscription billing server
#[derive(Parser, Debug)]
#[command(name = "payrail-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./payrail-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting payrail-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Convert to shared config with separate locks for each section
    let shared_config = loaded_config.into_shared();

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;
    let sweeper = get_sweeper_key().map_err(|e| {
        tracing::error!("Failed to read the sweeper key: {}", e);
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Start the vault watcher when a sweeper key is configured
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (vault_events, watcher_handle) = match sweeper {
        Some(sweeper) => {
            let (event_tx, event_rx) = vault_created_channel();
            let watcher = VaultWatcher::new(
                DatabaseProcessor::new(db_pool.clone()),
                shared_config.chain.clone(),
                shared_config.watcher.clone(),
                sweeper,
            );
            let handle = tokio::spawn(watcher.run(shutdown_rx, event_rx));
            (Some(event_tx), Some(handle))
        }
        None => {
            tracing::warn!(
                "{} not set, vault subscriptions will not be activated",
                config::SWEEPER_KEY_ENV
            );
            (None, None)
        }
    };

    // Create application state
    let state = AppState::new(db_pool.clone(), shared_config, vault_events);

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Signal the config reload handler to stop
    shutdown_notify.notify_one();

    // Stop the vault watcher and wait for its current scan to finish
    let _ = shutdown_tx.send(true);
    if let Some(handle) = watcher_handle {
        if let Err(e) = handle.await {
            tracing::error!("Vault watcher task failed: {}", e);
        }
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,alloy_transport_http=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
