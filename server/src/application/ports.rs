//! Port trait definitions for the application layer.
//!
//! Ports are the contracts infrastructure must fulfill. Tests substitute
//! in-memory implementations.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aio_common::{ArtifactInfo, FileType, StoredArtifact};

use crate::domain::{ExecError, ExecutionResult};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Everything needed to start one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Written in full, then the pipe is closed. `None` means the child sees
    /// end-of-input immediately.
    pub stdin: Option<Vec<u8>>,
    pub timeout: Duration,
    pub env: BTreeMap<String, String>,
}

impl RunSpec {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            timeout,
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn stdin(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    #[must_use]
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

// ── Artifact Store Port ───────────────────────────────────────────────────────

/// Persistent artifact namespace: two flat directories keyed by file type.
///
/// Synchronous by design: resolution and chmod are fast, and callers that
/// write large uploads move the call onto a blocking thread.
pub trait ArtifactRepository {
    /// Directory that holds artifacts of `file_type`.
    fn root(&self, file_type: FileType) -> &Path;

    /// Resolve `name` to an existing regular file, repairing its execute
    /// bit if needed. `{name}.bin` takes precedence over `{name}`.
    fn resolve(&self, file_type: FileType, name: &str) -> Result<PathBuf, ExecError>;

    /// Atomically write `content` under `filename` and mark it executable.
    fn store(
        &self,
        file_type: FileType,
        filename: &str,
        content: &mut dyn Read,
    ) -> Result<StoredArtifact, ExecError>;

    /// List stored artifacts, optionally restricted to one type.
    fn list(&self, file_type: Option<FileType>) -> Result<Vec<ArtifactInfo>, ExecError>;

    /// Remove the artifact `name` resolves to. Returns the removed path.
    fn delete(&self, file_type: FileType, name: &str) -> Result<PathBuf, ExecError>;

    /// Read the bytes of the artifact `name` resolves to.
    fn read(&self, file_type: FileType, name: &str) -> Result<Vec<u8>, ExecError>;
}

// ── Process Runner Port ───────────────────────────────────────────────────────

/// Abstracts child-process execution so it can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Run `spec` to completion or until its timeout.
    ///
    /// # Errors
    ///
    /// `TimedOut` (carrying partial output) when the deadline passes; the
    /// child's whole process group must be gone by the time this returns.
    /// `Io` when the program cannot be spawned. A nonzero exit is *not* an
    /// error.
    async fn run(&self, spec: RunSpec) -> Result<ExecutionResult, ExecError>;
}
