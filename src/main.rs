//! Media Cache server
//!
//! Serves image URL resolution, preloading and offline-aware collections
//! over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_cache::offline::FileStore;
use media_cache::tasks::HttpSyncRemote;
use media_cache::{create_router, spawn_cleanup_task, spawn_replay_task, AppState, Config};

/// Main entry point for the media cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store and restore collections and the offline queue
/// 4. Start background cleanup and replay tasks
/// 5. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting media cache server");

    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        cache_ttl = config.cache_ttl,
        port = config.server_port,
        storage_dir = %config.storage_dir.display(),
        "Configuration loaded"
    );

    let store = FileStore::open(&config.storage_dir)
        .with_context(|| format!("opening store at {}", config.storage_dir.display()))?;
    let state = AppState::from_config(&config, Arc::new(store)).context("restoring state")?;
    info!(
        items = state.collections.len(),
        pending = state.collections.queue().len(),
        "State restored"
    );

    let mut background = vec![spawn_cleanup_task(
        state.collections.clone(),
        state.builder.cache().clone(),
        config.cleanup_interval,
    )];

    match &config.sync_url {
        Some(url) => {
            let remote = Arc::new(HttpSyncRemote::new(reqwest::Client::new(), url));
            background.push(spawn_replay_task(
                state.collections.clone(),
                state.subscribe(),
                remote,
            ));
        }
        None => warn!("SYNC_URL not set, offline operations will not be replayed"),
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("serving")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts background tasks.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
