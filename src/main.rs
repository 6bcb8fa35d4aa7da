//! Radish - an in-memory key-value store with named caches
//!
//! Serves the registry over HTTP, sweeping expired entries in the background
//! and optionally persisting JSON backups.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radish::api::{create_router, AppState};
use radish::backup::BackupWriter;
use radish::{events, spawn_backup_task, spawn_sweep_task, CacheRegistry, Config};

/// Main entry point for the Radish server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache registry and restore the latest backups
/// 4. Start background sweep and backup tasks
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM, writing a final backup
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radish=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Radish server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, port={}, sweep_interval={}s, backup_dir={:?}",
        config.default_ttl_secs, config.server_port, config.sweep_interval, config.backup_dir
    );

    let registry = Arc::new(CacheRegistry::from_config(&config));
    events::log_events(registry.events());

    let backups = BackupWriter::from_config(&config);
    if let Some(writer) = &backups {
        match writer.restore_latest(&registry) {
            Ok(restored) if !restored.is_empty() => {
                info!("Restored {} caches from {}", restored.len(), writer.dir().display())
            }
            Ok(_) => {}
            Err(err) => warn!("Failed to restore backups: {}", err),
        }
    }

    let mut handles = vec![spawn_sweep_task(Arc::clone(&registry), config.sweep_interval)];
    if let Some(writer) = backups.clone() {
        handles.push(spawn_backup_task(
            Arc::clone(&registry),
            writer,
            config.backup_interval,
        ));
    }
    info!("Background tasks started");

    let app = create_router(AppState::from_shared(Arc::clone(&registry)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handles))
        .await
        .context("server error")?;

    if let Some(writer) = backups {
        let written = tokio::task::spawn_blocking(move || writer.backup_all(&registry))
            .await
            .context("final backup task panicked")?;
        match written {
            Ok(paths) => info!("Final backup wrote {} files", paths.len()),
            Err(err) => warn!("Final backup failed: {}", err),
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the background
/// tasks.
async fn shutdown_signal(handles: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in handles {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
