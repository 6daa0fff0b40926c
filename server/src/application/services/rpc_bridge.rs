//! JSON-RPC over stdio: one request line in, one response document out.
//!
//! Runner failures (`TimedOut`, spawn errors) pass through untouched; only
//! output the child actually produced is judged as protocol content.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use aio_common::{JsonRpcRequest, RpcId};
use serde_json::Value;

use crate::application::ports::{ProcessRunner, RunSpec};
use crate::domain::{ExecError, RpcEnvelope, decode_response, encode_request};

/// A validated response plus the diagnostics gathered alongside it.
#[derive(Debug, Clone)]
pub struct RpcReply {
    pub envelope: RpcEnvelope,
    /// Child stderr, kept for diagnostics; never parsed.
    pub stderr: String,
    pub exit_status: i32,
    pub duration: Duration,
}

/// Call `method` on the artifact at `path`.
///
/// # Errors
///
/// Runner errors unchanged, `OutputTruncated` when stdout hit the capture
/// limit, then `MalformedResponse`, `ProtocolViolation`, `IdMismatch` in
/// validation order.
pub async fn call(
    runner: &impl ProcessRunner,
    path: &Path,
    method: &str,
    params: Value,
    id: RpcId,
    timeout: Duration,
) -> Result<RpcReply, ExecError> {
    let request = JsonRpcRequest::new(method, params, id);
    call_request(runner, path, &request, timeout, BTreeMap::new()).await
}

/// Same as [`call`] for an already-built request, with extra child env.
pub async fn call_request(
    runner: &impl ProcessRunner,
    path: &Path,
    request: &JsonRpcRequest,
    timeout: Duration,
    env: BTreeMap<String, String>,
) -> Result<RpcReply, ExecError> {
    let line = encode_request(request)?;
    tracing::info!(
        path = %path.display(),
        method = %request.method,
        id = %request.id,
        timeout_secs = timeout.as_secs_f64(),
        "dispatching JSON-RPC request"
    );

    let spec = RunSpec::new(path, timeout).stdin(line).env(env);
    let result = runner.run(spec).await?;
    let stderr = result.stderr_lossy();

    if result.stdout_truncated {
        tracing::warn!(path = %path.display(), "JSON-RPC response exceeded capture limit");
        return Err(ExecError::OutputTruncated {
            stream: "stdout",
            limit: result.stdout.len(),
            stderr,
        });
    }

    let envelope = match decode_response(&result.stdout, &request.id, &stderr) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                kind = e.kind().as_str(),
                exit_status = result.exit_status,
                "invalid JSON-RPC response: {e}"
            );
            return Err(e);
        }
    };

    tracing::info!(
        path = %path.display(),
        id = %request.id,
        is_error = envelope.is_error(),
        exit_status = result.exit_status,
        duration_ms = result.duration.as_millis(),
        "JSON-RPC call completed"
    );

    Ok(RpcReply {
        envelope,
        stderr,
        exit_status: result.exit_status,
        duration: result.duration,
    })
}
