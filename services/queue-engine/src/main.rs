//! OQS queue engine
//!
//! Serves the queue API and runs the periodic sweeps: timeout expiry,
//! queued-deployment start and pod/deployment relationship repair.

use std::sync::Arc;

use anyhow::Result;
use oqs_queue_engine::{
    api,
    audit::HistoryAuditSink,
    clock::SystemClock,
    config::{self, StoreBackend},
    queue::Engine,
    scheduler::SweepScheduler,
    state::AppState,
    store::{MemoryStore, PgStore, Store},
    writer::EntityWriter,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to OQS_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting queue engine");
    info!(listen_addr = %config.listen_addr, store = ?config.store, "Configuration loaded");

    let (store, database) = match config.store {
        StoreBackend::Memory => (Store::memory(Arc::new(MemoryStore::new())), None),
        StoreBackend::Postgres => {
            let db = match PgStore::connect(&config.database).await {
                Ok(db) => {
                    info!("Database connection established");
                    db
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            // Run migrations in dev mode
            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }

            (Store::postgres(Arc::new(db.clone())), Some(db))
        }
    };

    let audit = Arc::new(HistoryAuditSink::new(store.clone()));
    let writer = EntityWriter::new(store, Arc::new(SystemClock), audit);
    let engine = Engine::new(writer);

    // Start the periodic sweeps
    let mut scheduler = SweepScheduler::new(engine.clone(), config.sweeps);
    scheduler.start();

    // Build and run the server
    let app = api::create_router(AppState::new(engine, database));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn the server with graceful shutdown
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for sweep workers to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);
    if tokio::time::timeout(shutdown_timeout, scheduler.stop())
        .await
        .is_err()
    {
        warn!("Sweep workers did not shut down in time");
    }

    info!("Queue engine shutdown complete");
    Ok(())
}
