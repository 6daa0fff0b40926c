//! HTTP surface: a thin axum layer translating requests into service calls.
//!
//! Imports from `crate::application`, `crate::domain` and `crate::infra` are
//! allowed. No execution logic lives here.

pub mod error;
pub mod routes;

use std::sync::Arc;

use aio_common::ServerConfig;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::infra::{FsArtifactStore, TokioProcessRunner};

pub use error::ApiError;

/// Shared, immutable per-process state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: FsArtifactStore,
    pub runner: TokioProcessRunner,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the store and runner described by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the artifact directories cannot be created.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let store = FsArtifactStore::open(&config.agent_exec_dir, &config.mcp_exec_dir)?;
        let mut runner = TokioProcessRunner::new(config.max_output_bytes);
        if let Some(limit) = config.max_concurrent_per_artifact {
            runner = runner.with_admission_limit(limit);
        }
        Ok(Self {
            store,
            runner,
            config: Arc::new(config),
        })
    }
}

/// Compose the full application router.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/upload/{file_type}",
            post(routes::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/execute/{file_type}/{name}", post(routes::execute))
        .route("/rpc/{file_type}/{name}", post(routes::rpc))
        .route("/files", get(routes::list_files))
        .route(
            "/files/{file_type}/{name}",
            get(routes::download).delete(routes::delete_file),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
