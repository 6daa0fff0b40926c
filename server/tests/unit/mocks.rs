//! Shared mock infrastructure for unit tests.
//!
//! Provides an in-memory [`ArtifactRepository`] and a scripted
//! [`ProcessRunner`] so each test file doesn't re-define the same
//! boilerplate.

#![allow(clippy::expect_used, dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aio_common::{ArtifactInfo, FileType, StoredArtifact};
use aio_server::application::ports::{ArtifactRepository, ProcessRunner, RunSpec};
use aio_server::domain::{ExecError, ExecutionResult};
use chrono::Utc;

// ── Result helpers ────────────────────────────────────────────────────────────

pub fn exited(code: i32, stdout: &[u8], stderr: &[u8]) -> ExecutionResult {
    ExecutionResult {
        exit_status: code,
        stdout: stdout.to_vec(),
        stderr: stderr.to_vec(),
        duration: Duration::from_millis(5),
        ..ExecutionResult::default()
    }
}

// ── Mock: in-memory artifact store ────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryRepo {
    files: Arc<Mutex<HashMap<(FileType, String), Vec<u8>>>>,
}

impl MemoryRepo {
    pub fn with(file_type: FileType, name: &str, content: &[u8]) -> Self {
        let repo = Self::default();
        repo.insert(file_type, name, content);
        repo
    }

    pub fn insert(&self, file_type: FileType, name: &str, content: &[u8]) {
        self.files
            .lock()
            .expect("lock")
            .insert((file_type, name.to_string()), content.to_vec());
    }

    pub fn content(&self, file_type: FileType, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .expect("lock")
            .get(&(file_type, name.to_string()))
            .cloned()
    }

    fn dir(file_type: FileType) -> &'static Path {
        match file_type {
            FileType::Agent => Path::new("/mem/agent"),
            FileType::Mcp => Path::new("/mem/mcp"),
        }
    }
}

impl ArtifactRepository for MemoryRepo {
    fn root(&self, file_type: FileType) -> &Path {
        Self::dir(file_type)
    }

    fn resolve(&self, file_type: FileType, name: &str) -> Result<PathBuf, ExecError> {
        let files = self.files.lock().expect("lock");
        for candidate in [format!("{name}.bin"), name.to_string()] {
            if files.contains_key(&(file_type, candidate.clone())) {
                return Ok(Self::dir(file_type).join(candidate));
            }
        }
        Err(ExecError::NotFound {
            file_type,
            name: name.to_string(),
        })
    }

    fn store(
        &self,
        file_type: FileType,
        filename: &str,
        content: &mut dyn Read,
    ) -> Result<StoredArtifact, ExecError> {
        let mut buf = Vec::new();
        content
            .read_to_end(&mut buf)
            .map_err(|source| ExecError::Io {
                context: "reading upload".to_string(),
                source,
            })?;
        let size = buf.len() as u64;
        self.files
            .lock()
            .expect("lock")
            .insert((file_type, filename.to_string()), buf);
        Ok(StoredArtifact {
            path: Self::dir(file_type).join(filename).display().to_string(),
            filename: filename.to_string(),
            file_type,
            mode: 0o755,
            size,
            sha256: "0".repeat(64),
        })
    }

    fn list(&self, file_type: Option<FileType>) -> Result<Vec<ArtifactInfo>, ExecError> {
        let files = self.files.lock().expect("lock");
        Ok(files
            .iter()
            .filter(|((ft, _), _)| file_type.is_none_or(|want| *ft == want))
            .map(|((ft, name), bytes)| ArtifactInfo {
                filename: name.clone(),
                path: Self::dir(*ft).join(name).display().to_string(),
                file_type: *ft,
                size: bytes.len() as u64,
                modified_at: Utc::now(),
            })
            .collect())
    }

    fn delete(&self, file_type: FileType, name: &str) -> Result<PathBuf, ExecError> {
        let path = self.resolve(file_type, name)?;
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.files.lock().expect("lock").remove(&(file_type, key));
        Ok(path)
    }

    fn read(&self, file_type: FileType, name: &str) -> Result<Vec<u8>, ExecError> {
        let path = self.resolve(file_type, name)?;
        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.content(file_type, &key).unwrap_or_default())
    }
}

// ── Mock: scripted process runner ─────────────────────────────────────────────

type Script = dyn Fn(&RunSpec) -> Result<ExecutionResult, ExecError> + Send + Sync;

/// Records every `RunSpec` it receives and answers with `script`.
pub struct ScriptedRunner {
    script: Box<Script>,
    calls: Mutex<Vec<RunSpec>>,
}

impl ScriptedRunner {
    pub fn new(
        script: impl Fn(&RunSpec) -> Result<ExecutionResult, ExecError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with a successful exit and `stdout`.
    pub fn replying(stdout: &'static [u8]) -> Self {
        Self::new(move |_| Ok(exited(0, stdout, b"")))
    }

    pub fn calls(&self) -> Vec<RunSpec> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn only_call(&self) -> RunSpec {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one run");
        calls.into_iter().next().expect("one call")
    }
}

impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: RunSpec) -> Result<ExecutionResult, ExecError> {
        let result = (self.script)(&spec);
        self.calls.lock().expect("lock").push(spec);
        result
    }
}

/// Runner that fails the test if it is ever invoked.
pub struct UnreachableRunner;

impl ProcessRunner for UnreachableRunner {
    async fn run(&self, spec: RunSpec) -> Result<ExecutionResult, ExecError> {
        panic!("runner must not be called, got {}", spec.program.display());
    }
}
