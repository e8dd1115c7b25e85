//! arty-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON or pretty, optional log file).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build the model registry and generation pipeline.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod logging;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use arty_core::{GenerationPipeline, ModelRegistry, RemoteBackend, SqliteHistoryStore};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let _log_guard = logging::init(&cfg)?;
    info!(version = env!("CARGO_PKG_VERSION"), "arty-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteHistoryStore::connect(&cfg.database_url).await?;
    info!(database_url = %cfg.database_url, "database ready");

    // ── 4. Models and pipeline ─────────────────────────────────────────────────
    let mut registry = ModelRegistry::new();
    match &cfg.backend_url {
        Some(url) => {
            registry = registry.with_remote(RemoteBackend::new(url.clone()));
            info!(backend_url = %url, "remote inference backend configured");
        }
        None => warn!("ARTY_BACKEND_URL is not set; no models are available"),
    }

    let mut pipeline = GenerationPipeline::new(Arc::new(registry), Arc::new(store))
        .with_params(cfg.generation_params());
    if let Some(dir) = &cfg.artifacts_dir {
        pipeline = pipeline.with_artifacts_dir(dir.clone());
        info!(artifacts_dir = %dir.display(), "artifacts are also written to disk");
    }

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        pipeline: Arc::new(pipeline),
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("arty-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
