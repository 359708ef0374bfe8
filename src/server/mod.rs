//! HTTP server for navmap
//!
//! Bridges a browser shell to one map session: place search, routing and
//! intent updates over a small REST API.

pub mod routes;
pub mod state;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::HeadlessRuntime;
use routes::create_router;
use state::{collect_notices, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Start the HTTP server and its map session
///
/// Runs until Ctrl-C, then shuts the session down and waits for the
/// surface to be released.
pub async fn run(config: Config) -> Result<()> {
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| Error::Server(format!("Invalid server address: {}", e)))?;

    let (runtime, handle, notices) = HeadlessRuntime::headless(&config)?;
    info!(session = %runtime.session_id(), "map session started");
    let session = tokio::spawn(runtime.run());

    let state = Arc::new(AppState::new(config, handle.clone())?);
    tokio::spawn(collect_notices(state.clone(), notices));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Server(format!("Server error: {}", e)))?;

    handle.shutdown()?;
    let surface = session
        .await
        .map_err(|e| Error::Server(format!("Session task failed: {}", e)))?;
    info!(calls = surface.mutation_count(), "map session closed");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
