//! Request handlers. Each one parses the HTTP shape, calls a single
//! service, and renders the outcome.

use std::collections::BTreeMap;
use std::time::Duration;

use aio_common::{ArtifactInfo, FileType, JSONRPC_VERSION, JsonRpcRequest};
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, AppState};
use crate::application::ports::ArtifactRepository;
use crate::application::services::{execute, upload};
use crate::domain::{ArtifactRef, ExecutionMode, ExecutionRequest, ExecutionResult};

fn parse_file_type(raw: &str) -> Result<FileType, ApiError> {
    raw.parse().map_err(|e| ApiError::bad_request(format!("{e}")))
}

fn timeout_for(state: &AppState, requested: Option<u64>) -> Duration {
    Duration::from_secs(state.config.effective_timeout_secs(requested))
}

// ── Health ────────────────────────────────────────────────────────────────────

/// Minimal health-check handler for load-balancer probes.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ── Upload ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Store under this name instead of the multipart file name.
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub path: String,
    pub filename: String,
    pub size: u64,
    pub sha256: String,
}

pub async fn upload(
    State(state): State<AppState>,
    Path(file_type): Path<String>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file_type = parse_file_type(&file_type)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::multipart(&e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = query
            .filename
            .clone()
            .or_else(|| field.file_name().map(str::to_string))
            .unwrap_or_default();
        tracing::info!(file_type = %file_type, filename = %filename, "receiving upload");
        let content = field.bytes().await.map_err(|e| ApiError::multipart(&e))?;

        let stored = upload::receive(&state.store, file_type, &filename, content).await?;
        return Ok(Json(UploadResponse {
            status: "stored",
            path: stored.path,
            filename: stored.filename,
            size: stored.size,
            sha256: stored.sha256,
        }));
    }

    Err(ApiError::bad_request("multipart field 'file' is required"))
}

// ── Direct execution ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteBody {
    #[serde(default)]
    pub args: Vec<String>,
    pub stdin: Option<String>,
    /// Seconds; clamped to the configured maximum.
    pub timeout: Option<u64>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl From<&ExecutionResult> for ExecuteResponse {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            exit_status: result.exit_status,
            stdout: result.stdout_lossy(),
            stderr: result.stderr_lossy(),
            duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            stdout_truncated: result.stdout_truncated,
            stderr_truncated: result.stderr_truncated,
        }
    }
}

/// Run an artifact with a plain argument vector. A nonzero exit is
/// reported with a 500 status and the same body shape.
pub async fn execute(
    State(state): State<AppState>,
    Path((file_type, name)): Path<(String, String)>,
    Json(body): Json<ExecuteBody>,
) -> Result<(StatusCode, Json<ExecuteResponse>), ApiError> {
    let file_type = parse_file_type(&file_type)?;
    let request = ExecutionRequest {
        artifact: ArtifactRef::new(file_type, name),
        mode: ExecutionMode::Direct {
            args: body.args,
            stdin: body.stdin.map(String::into_bytes),
        },
        timeout: timeout_for(&state, body.timeout),
        env: body.env,
    };

    let outcome = execute::execute(&state.store, &state.runner, request).await?;
    let result = outcome
        .into_direct()
        .ok_or_else(|| ApiError::internal("direct execution produced an RPC reply"))?;

    let status = if result.success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(ExecuteResponse::from(&result))))
}

// ── JSON-RPC ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcQuery {
    pub timeout: Option<u64>,
}

/// Boundary validation: the body must itself be a JSON-RPC 2.0 request.
fn parse_rpc_request(body: Value) -> Result<JsonRpcRequest, ApiError> {
    let Some(obj) = body.as_object() else {
        return Err(ApiError::bad_request("JSON-RPC request must be an object"));
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(ApiError::bad_request("\"jsonrpc\" must be \"2.0\""));
    }
    match obj.get("method").and_then(Value::as_str) {
        Some(method) if !method.is_empty() => {}
        _ => return Err(ApiError::bad_request("\"method\" must be a non-empty string")),
    }
    serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON-RPC request: {e}")))
}

/// Relay one JSON-RPC request to the artifact and return its envelope
/// verbatim.
pub async fn rpc(
    State(state): State<AppState>,
    Path((file_type, name)): Path<(String, String)>,
    Query(query): Query<RpcQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let file_type = parse_file_type(&file_type)?;
    let rpc = parse_rpc_request(body)?;
    let request = ExecutionRequest {
        artifact: ArtifactRef::new(file_type, name),
        mode: ExecutionMode::JsonRpc {
            method: rpc.method,
            params: rpc.params,
            id: rpc.id,
        },
        timeout: timeout_for(&state, query.timeout),
        env: BTreeMap::new(),
    };

    let outcome = execute::execute(&state.store, &state.runner, request).await?;
    let reply = outcome
        .into_rpc()
        .ok_or_else(|| ApiError::internal("JSON-RPC execution produced a direct result"))?;
    if !reply.stderr.is_empty() {
        tracing::debug!(stderr = %reply.stderr, "JSON-RPC child stderr");
    }
    Ok(Json(reply.envelope.body))
}

// ── Files ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<ArtifactInfo>,
    pub total: usize,
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let file_type = query.file_type.as_deref().map(parse_file_type).transpose()?;
    let files = state.store.list(file_type)?;
    Ok(Json(FileListResponse {
        total: files.len(),
        files,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    Path((file_type, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let file_type = parse_file_type(&file_type)?;
    let bytes = state.store.read(file_type, &name)?;
    let disposition = format!("attachment; filename=\"{name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub path: String,
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path((file_type, name)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let file_type = parse_file_type(&file_type)?;
    let path = state.store.delete(file_type, &name)?;
    Ok(Json(DeleteResponse {
        status: "deleted",
        path: path.display().to_string(),
    }))
}
