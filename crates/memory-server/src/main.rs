// ============================================================================
// mem0-server: REST API for per-user semantic memory
// ============================================================================
// Usage:
//   QDRANT_URL=http://localhost:6334 OPENAI_API_KEY=sk-... mem0-server
//   mem0-server --port 8002 --collection user_memories
// ============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use memory_server::{AppState, QdrantConnector, Settings};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Could not load .env file: {}", e);
        }
    }

    let settings = Settings::parse();

    // Initialize logging; RUST_LOG wins over LOG_LEVEL
    let level = settings.log_level.to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{level},memory_server={level},memory_core={level}"
            ))
        }))
        .init();

    info!("Starting mem0 server v{}", memory_server::VERSION);

    let settings = Arc::new(settings);
    let connector = Arc::new(QdrantConnector::new(Arc::clone(&settings)));
    let state = AppState::new(Arc::clone(&settings), Some(connector));

    if !state.initialize().await {
        warn!("Starting in degraded mode");
    }

    let app = memory_server::app(state.clone());

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(address = %addr, "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down mem0 server...");
    state.close().await;
    info!("mem0 server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
