//! Execute-by-name: resolve an artifact, then drive it directly or over
//! JSON-RPC.

use aio_common::JsonRpcRequest;

use crate::application::ports::{ArtifactRepository, ProcessRunner, RunSpec};
use crate::application::services::rpc_bridge::{self, RpcReply};
use crate::domain::{ExecError, ExecutionMode, ExecutionRequest, ExecutionResult};

#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Direct(ExecutionResult),
    Rpc(RpcReply),
}

impl ExecutionOutcome {
    #[must_use]
    pub fn into_direct(self) -> Option<ExecutionResult> {
        match self {
            ExecutionOutcome::Direct(result) => Some(result),
            ExecutionOutcome::Rpc(_) => None,
        }
    }

    #[must_use]
    pub fn into_rpc(self) -> Option<RpcReply> {
        match self {
            ExecutionOutcome::Rpc(reply) => Some(reply),
            ExecutionOutcome::Direct(_) => None,
        }
    }
}

/// Resolve `request.artifact` and run it in the requested mode.
///
/// The exit status of a direct run is reported, not interpreted.
///
/// # Errors
///
/// Store errors from resolution, runner errors, and (in JSON-RPC mode)
/// bridge errors, each unchanged.
pub async fn execute(
    repo: &impl ArtifactRepository,
    runner: &impl ProcessRunner,
    request: ExecutionRequest,
) -> Result<ExecutionOutcome, ExecError> {
    let ExecutionRequest {
        artifact,
        mode,
        timeout,
        env,
    } = request;
    let path = repo.resolve(artifact.file_type, &artifact.logical_name)?;

    match mode {
        ExecutionMode::Direct { args, stdin } => {
            tracing::info!(
                path = %path.display(),
                args = args.len(),
                stdin_bytes = stdin.as_ref().map_or(0, Vec::len),
                timeout_secs = timeout.as_secs_f64(),
                "executing artifact"
            );
            let mut spec = RunSpec::new(&path, timeout).args(args).env(env);
            if let Some(payload) = stdin {
                spec = spec.stdin(payload);
            }
            let result = runner.run(spec).await?;
            tracing::info!(
                path = %path.display(),
                exit_status = result.exit_status,
                duration_ms = result.duration.as_millis(),
                stdout_truncated = result.stdout_truncated,
                stderr_truncated = result.stderr_truncated,
                "artifact finished"
            );
            tracing::debug!(
                stdout = %result.stdout_lossy(),
                stderr = %result.stderr_lossy(),
                "artifact output"
            );
            Ok(ExecutionOutcome::Direct(result))
        }
        ExecutionMode::JsonRpc { method, params, id } => {
            let rpc = JsonRpcRequest::new(method, params, id);
            rpc_bridge::call_request(runner, &path, &rpc, timeout, env)
                .await
                .map(ExecutionOutcome::Rpc)
        }
    }
}
