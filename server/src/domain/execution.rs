//! Execution request/result value types.

use std::collections::BTreeMap;
use std::time::Duration;

use aio_common::RpcId;
use serde_json::Value;

use crate::domain::artifact::ArtifactRef;

/// How the resolved artifact is driven.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Plain argument vector, optional stdin bytes.
    Direct {
        args: Vec<String>,
        stdin: Option<Vec<u8>>,
    },
    /// One JSON-RPC request on stdin, one response on stdout.
    JsonRpc {
        method: String,
        params: Value,
        id: RpcId,
    },
}

/// One call against a stored artifact. Built per request and discarded
/// after the response is produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub artifact: ArtifactRef,
    pub mode: ExecutionMode,
    pub timeout: Duration,
    /// Extra variables layered over the server environment for this child only.
    pub env: BTreeMap<String, String>,
}

/// Captured outcome of a finished (or killed) child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code, or `128 + signal` when the child died from a signal.
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl ExecutionResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    #[must_use]
    pub fn truncated(&self) -> bool {
        self.stdout_truncated || self.stderr_truncated
    }

    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
