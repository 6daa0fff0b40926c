//! Infrastructure implementation of the `ProcessRunner` port.
//!
//! `TokioProcessRunner` spawns each artifact in its own process group and
//! owns that group through a guard: whichever way a run ends (exit, timeout,
//! or the caller dropping the future on client disconnect) the guard kills
//! every remaining member. `kill_on_drop` alone would only reach the direct
//! child and leave grandchildren running.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::application::ports::{ProcessRunner, RunSpec};
use crate::domain::{ExecError, ExecutionResult};

/// Default wall-clock limit for one execution.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-stream capture limit.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// How long readers may keep draining once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Spawn attempts when the executable is still open for writing elsewhere.
const SPAWN_ATTEMPTS: u32 = 4;

/// Production `ProcessRunner`.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    max_output_bytes: usize,
    admission: Option<Arc<Admission>>,
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl TokioProcessRunner {
    #[must_use]
    pub fn new(max_output_bytes: usize) -> Self {
        Self {
            max_output_bytes,
            admission: None,
        }
    }

    /// Allow at most `limit` simultaneous runs of any single artifact path.
    /// Waiting for a slot counts against the run's timeout.
    #[must_use]
    pub fn with_admission_limit(mut self, limit: usize) -> Self {
        self.admission = Some(Arc::new(Admission {
            limit: limit.max(1),
            slots: Mutex::new(HashMap::new()),
        }));
        self
    }

    #[must_use]
    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }
}

// ── Admission ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Admission {
    limit: usize,
    slots: Mutex<HashMap<PathBuf, Arc<Semaphore>>>,
}

impl Admission {
    fn semaphore(&self, path: &Path) -> Arc<Semaphore> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Semaphore::new(self.limit))),
        )
    }

    /// Forget `path` once no run holds or awaits its semaphore. Clones are
    /// only taken under the same lock, so a count of one is stable here.
    fn prune(&self, path: &Path) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(path).is_some_and(|sem| Arc::strong_count(sem) == 1) {
            slots.remove(path);
        }
    }
}

/// A held execution slot. Releases the permit, then prunes the path entry.
struct Slot {
    admission: Arc<Admission>,
    path: PathBuf,
    permit: Option<OwnedSemaphorePermit>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.admission.prune(&self.path);
    }
}

// ── Process group ownership ───────────────────────────────────────────────────

/// Kills the child's process group when dropped.
struct GroupGuard {
    pgid: Option<u32>,
}

impl GroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and has no memory-safety
    // preconditions. The negative pid targets the group created for this
    // child by `process_group(0)`.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // ESRCH: every member is already gone.
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, "failed to kill process group: {err}");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

// ── Output capture ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

type SharedCapture = Arc<Mutex<Captured>>;

/// Read `reader` to EOF, keeping at most `limit` bytes. Reading continues
/// past the limit so the child never blocks on a full pipe.
fn spawn_capture<R>(reader: Option<R>, limit: usize) -> (SharedCapture, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let sink = SharedCapture::default();
    let task_sink = Arc::clone(&sink);
    let handle = tokio::spawn(async move {
        let Some(mut reader) = reader else { return };
        let mut buf = vec![0u8; 8192];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            let mut captured = task_sink.lock().unwrap_or_else(PoisonError::into_inner);
            let room = limit.saturating_sub(captured.bytes.len());
            let keep = n.min(room);
            captured.bytes.extend_from_slice(&buf[..keep]);
            if keep < n {
                captured.truncated = true;
            }
        }
    });
    (sink, handle)
}

fn take_capture(sink: &SharedCapture) -> Captured {
    std::mem::take(&mut *sink.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Wait briefly for a reader, then give up on it. Returns `false` if the
/// reader had to be abandoned.
async fn settle(handle: &mut JoinHandle<()>) -> bool {
    if tokio::time::timeout(DRAIN_GRACE, &mut *handle).await.is_err() {
        handle.abort();
        return false;
    }
    true
}

// ── Spawning ──────────────────────────────────────────────────────────────────

fn build_command(spec: &RunSpec) -> Command {
    let mut cmd = std::process::Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut cmd = Command::from(cmd);
    cmd.kill_on_drop(true);
    cmd
}

#[cfg(unix)]
fn is_text_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_busy(_err: &io::Error) -> bool {
    false
}

async fn spawn(spec: &RunSpec) -> Result<Child, ExecError> {
    let mut attempt = 1;
    loop {
        match build_command(spec).spawn() {
            Ok(child) => return Ok(child),
            Err(e) if is_text_busy(&e) && attempt < SPAWN_ATTEMPTS => {
                tracing::debug!(path = %spec.program.display(), attempt, "executable busy, retrying spawn");
                tokio::time::sleep(Duration::from_millis(25 * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(ExecError::PermissionDenied {
                    path: spec.program.clone(),
                    source: e,
                });
            }
            Err(e) => {
                return Err(ExecError::io(
                    format!("failed to spawn {}", spec.program.display()),
                    e,
                ));
            }
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, mut spec: RunSpec) -> Result<ExecutionResult, ExecError> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + spec.timeout;

        let _slot: Option<Slot> = match &self.admission {
            Some(admission) => {
                let semaphore = admission.semaphore(&spec.program);
                match tokio::time::timeout_at(deadline, semaphore.acquire_owned()).await {
                    Ok(permit) => Some(Slot {
                        admission: Arc::clone(admission),
                        path: spec.program.clone(),
                        permit: permit.ok(),
                    }),
                    Err(_) => {
                        admission.prune(&spec.program);
                        tracing::warn!(path = %spec.program.display(), "timed out waiting for an execution slot");
                        return Err(ExecError::TimedOut {
                            path: spec.program,
                            timeout: spec.timeout,
                            partial: Box::new(ExecutionResult {
                                duration: started.elapsed(),
                                ..ExecutionResult::default()
                            }),
                        });
                    }
                }
            }
            None => None,
        };

        let mut child = spawn(&spec).await?;
        let mut group = GroupGuard::new(child.id());
        tracing::debug!(path = %spec.program.display(), pid = ?child.id(), "child spawned");

        let (stdout, mut stdout_task) = spawn_capture(child.stdout.take(), self.max_output_bytes);
        let (stderr, mut stderr_task) = spawn_capture(child.stderr.take(), self.max_output_bytes);

        let stdin_task = match (spec.stdin.take(), child.stdin.take()) {
            (Some(payload), Some(mut pipe)) => Some(tokio::spawn(async move {
                // EPIPE just means the child stopped reading; its output decides.
                if let Err(e) = pipe.write_all(&payload).await {
                    tracing::debug!("stdin write ended early: {e}");
                }
                let _ = pipe.shutdown().await;
            })),
            _ => None,
        };

        let waited = tokio::time::timeout_at(deadline, child.wait()).await;

        // Stragglers in the group go now, on every path.
        group.kill();
        if let Some(task) = stdin_task {
            task.abort();
        }

        match waited {
            Ok(Ok(status)) => {
                // A descendant that left the group can hold the pipes open;
                // the child has exited, so drain briefly and report it.
                let (stdout_done, stderr_done) =
                    tokio::join!(settle(&mut stdout_task), settle(&mut stderr_task));
                if !(stdout_done && stderr_done) {
                    tracing::debug!(path = %spec.program.display(), "output pipes held open after exit");
                }
                let out = take_capture(&stdout);
                let err = take_capture(&stderr);
                Ok(ExecutionResult {
                    exit_status: exit_code(status),
                    stdout: out.bytes,
                    stderr: err.bytes,
                    duration: started.elapsed(),
                    stdout_truncated: out.truncated,
                    stderr_truncated: err.truncated,
                })
            }
            Ok(Err(e)) => Err(ExecError::io(
                format!("waiting for {}", spec.program.display()),
                e,
            )),
            Err(_) => {
                let _ = child.start_kill();
                let status = tokio::time::timeout(DRAIN_GRACE, child.wait()).await;
                tokio::join!(settle(&mut stdout_task), settle(&mut stderr_task));
                let out = take_capture(&stdout);
                let err = take_capture(&stderr);
                tracing::warn!(
                    path = %spec.program.display(),
                    timeout_secs = spec.timeout.as_secs_f64(),
                    stdout_bytes = out.bytes.len(),
                    stderr_bytes = err.bytes.len(),
                    "execution timed out, process group killed"
                );
                Err(ExecError::TimedOut {
                    path: spec.program,
                    timeout: spec.timeout,
                    partial: Box::new(ExecutionResult {
                        exit_status: match status {
                            Ok(Ok(status)) => exit_code(status),
                            _ => -1,
                        },
                        stdout: out.bytes,
                        stderr: err.bytes,
                        duration: started.elapsed(),
                        stdout_truncated: out.truncated,
                        stderr_truncated: err.truncated,
                    }),
                })
            }
        }
    }
}
