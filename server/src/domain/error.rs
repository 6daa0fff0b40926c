//! Typed error taxonomy for the execution subsystem.
//!
//! Store-layer, runner-layer, and bridge-layer failures share one enum so
//! callers can match on the failure kind without downcasting. Every variant
//! that can carry child stderr does, so "file missing", "file crashed" and
//! "file hung" stay distinguishable at the HTTP boundary.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use aio_common::{FileType, RpcId};
use thiserror::Error;

use crate::domain::execution::ExecutionResult;

#[derive(Debug, Error)]
pub enum ExecError {
    // ── Store layer ───────────────────────────────────────────────────────────
    #[error("invalid artifact name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{file_type} artifact '{name}' not found")]
    NotFound { file_type: FileType, name: String },

    #[error("cannot set execute permission on {}: {source}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    // ── Runner layer ──────────────────────────────────────────────────────────
    #[error("{} did not exit within {}s", path.display(), timeout.as_secs_f64())]
    TimedOut {
        path: PathBuf,
        timeout: Duration,
        /// Whatever the child wrote before it was killed.
        partial: Box<ExecutionResult>,
    },

    #[error("{stream} exceeded the {limit}-byte capture limit")]
    OutputTruncated {
        stream: &'static str,
        limit: usize,
        stderr: String,
    },

    // ── Bridge layer ──────────────────────────────────────────────────────────
    #[error("response is not valid JSON: {detail}")]
    MalformedResponse { detail: String, stderr: String },

    #[error("response is not a JSON-RPC 2.0 envelope: {detail}")]
    ProtocolViolation { detail: String, stderr: String },

    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch {
        expected: RpcId,
        actual: String,
        stderr: String,
    },
}

/// Stable, serializable name of each failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidName,
    NotFound,
    PermissionDenied,
    Io,
    TimedOut,
    OutputTruncated,
    MalformedResponse,
    ProtocolViolation,
    IdMismatch,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidName => "invalid_name",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Io => "io_error",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::OutputTruncated => "output_truncated",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::ProtocolViolation => "protocol_violation",
            ErrorKind::IdMismatch => "id_mismatch",
        }
    }
}

impl ExecError {
    pub(crate) fn invalid_name(name: &str, reason: &'static str) -> Self {
        ExecError::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        ExecError::Io {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::InvalidName { .. } => ErrorKind::InvalidName,
            ExecError::NotFound { .. } => ErrorKind::NotFound,
            ExecError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ExecError::Io { .. } => ErrorKind::Io,
            ExecError::TimedOut { .. } => ErrorKind::TimedOut,
            ExecError::OutputTruncated { .. } => ErrorKind::OutputTruncated,
            ExecError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ExecError::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            ExecError::IdMismatch { .. } => ErrorKind::IdMismatch,
        }
    }

    /// Captured child stderr, when the failure happened after a spawn.
    #[must_use]
    pub fn stderr(&self) -> Option<String> {
        match self {
            ExecError::TimedOut { partial, .. } => Some(partial.stderr_lossy()),
            ExecError::OutputTruncated { stderr, .. }
            | ExecError::MalformedResponse { stderr, .. }
            | ExecError::ProtocolViolation { stderr, .. }
            | ExecError::IdMismatch { stderr, .. } => Some(stderr.clone()),
            _ => None,
        }
    }
}
