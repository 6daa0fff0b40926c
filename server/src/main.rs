//! aio-server entry point.
//!
//! Loads configuration from `AIO_*` environment variables, initialises
//! tracing, prepares the artifact directories, and serves the HTTP API.

use anyhow::{Context, Result};
use aio_common::ServerConfig;

use aio_server::api::{self, AppState};
use aio_server::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration; every field has a default.
    let config: ServerConfig = envy::prefixed("AIO_")
        .from_env()
        .context("failed to load config from AIO_* env vars")?;

    // 2. Initialise tracing (stderr, plus rotated files when AIO_LOG_DIR is set).
    logging::init(config.log_dir.as_deref())?;

    config.validate().context("invalid configuration")?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        agent_dir = %config.agent_exec_dir.display(),
        mcp_dir = %config.mcp_exec_dir.display(),
        default_timeout_secs = config.default_timeout_secs,
        max_timeout_secs = config.max_timeout_secs,
        max_output_bytes = config.max_output_bytes,
        admission_limit = ?config.max_concurrent_per_artifact,
        "configuration loaded",
    );

    // 3. Build shared state (creates the artifact directories).
    let addr = config.listen_addr;
    let state = AppState::from_config(config).context("failed to prepare artifact store")?;
    let router = api::router(state);

    // 4. Bind and serve until Ctrl-C.
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("aio-server ready on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("aio-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
