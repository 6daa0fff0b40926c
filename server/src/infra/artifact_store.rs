//! Filesystem implementation of `ArtifactRepository`.
//!
//! Layout: one flat directory per `FileType`; existence on disk is the only
//! source of truth. Uploads land in a hidden temp file in the same directory
//! and are renamed into place, so a resolver never sees a partial file.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aio_common::{ArtifactInfo, FileType, StoredArtifact};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::application::ports::ArtifactRepository;
use crate::domain::artifact::{EXECUTABLE_MODE, is_directly_inside};
use crate::domain::{ExecError, candidate_names, needs_exec_bit, validate_artifact_name};

const UPLOAD_TEMP_PREFIX: &str = ".upload-";

#[derive(Debug)]
struct Roots {
    agent: PathBuf,
    mcp: PathBuf,
}

/// Production artifact store. Cheap to clone; roots are immutable.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    roots: Arc<Roots>,
}

impl FsArtifactStore {
    /// Open a store over the two roots, making them absolute and creating
    /// them if missing.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a root cannot be made absolute or created.
    pub fn open(agent_dir: impl AsRef<Path>, mcp_dir: impl AsRef<Path>) -> Result<Self, ExecError> {
        let agent = prepare_root(agent_dir.as_ref())?;
        let mcp = prepare_root(mcp_dir.as_ref())?;
        tracing::debug!(agent = %agent.display(), mcp = %mcp.display(), "artifact roots ready");
        Ok(Self {
            roots: Arc::new(Roots { agent, mcp }),
        })
    }

    /// Find the existing candidate for `name` without touching permissions.
    fn locate(&self, file_type: FileType, name: &str) -> Result<(PathBuf, fs::Metadata), ExecError> {
        validate_artifact_name(name)?;
        let root = self.root(file_type);
        for candidate in candidate_names(name) {
            let path = root.join(&candidate);
            if !is_directly_inside(root, &path) {
                return Err(ExecError::invalid_name(name, "name escapes the artifact directory"));
            }
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => return Ok((path, meta)),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ExecError::io(format!("inspecting {}", path.display()), e)),
            }
        }
        Err(ExecError::NotFound {
            file_type,
            name: name.to_string(),
        })
    }
}

fn prepare_root(dir: &Path) -> Result<PathBuf, ExecError> {
    let abs = std::path::absolute(dir)
        .map_err(|e| ExecError::io(format!("resolving {}", dir.display()), e))?;
    fs::create_dir_all(&abs)
        .map_err(|e| ExecError::io(format!("creating directory {}", abs.display()), e))?;
    Ok(abs)
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    EXECUTABLE_MODE
}

fn set_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Stream `content` into `out`, hashing as it goes. Returns (size, sha256).
fn copy_hashed(content: &mut dyn Read, out: &mut impl Write) -> io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    let mut size = 0u64;
    loop {
        let n = match content.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n])?;
        size += n as u64;
    }
    Ok((size, format!("{:x}", hasher.finalize())))
}

impl ArtifactRepository for FsArtifactStore {
    fn root(&self, file_type: FileType) -> &Path {
        match file_type {
            FileType::Agent => &self.roots.agent,
            FileType::Mcp => &self.roots.mcp,
        }
    }

    fn resolve(&self, file_type: FileType, name: &str) -> Result<PathBuf, ExecError> {
        let (path, meta) = self.locate(file_type, name)?;
        let mode = file_mode(&meta);
        if needs_exec_bit(mode) {
            tracing::info!(path = %path.display(), mode = %format_args!("{mode:o}"), "setting executable permissions");
            set_executable(&path).map_err(|source| ExecError::PermissionDenied {
                path: path.clone(),
                source,
            })?;
        }
        Ok(path)
    }

    fn store(
        &self,
        file_type: FileType,
        filename: &str,
        content: &mut dyn Read,
    ) -> Result<StoredArtifact, ExecError> {
        validate_artifact_name(filename)?;
        let root = self.root(file_type);
        let final_path = root.join(filename);
        if !is_directly_inside(root, &final_path) {
            return Err(ExecError::invalid_name(filename, "name escapes the artifact directory"));
        }

        // Temp file is removed on drop if anything below fails.
        let mut tmp = tempfile::Builder::new()
            .prefix(UPLOAD_TEMP_PREFIX)
            .tempfile_in(root)
            .map_err(|e| ExecError::io(format!("creating temp file in {}", root.display()), e))?;

        let (size, sha256) = copy_hashed(content, tmp.as_file_mut())
            .map_err(|e| ExecError::io(format!("writing upload for {filename}"), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ExecError::io(format!("syncing upload for {filename}"), e))?;
        set_executable(tmp.path()).map_err(|source| ExecError::PermissionDenied {
            path: tmp.path().to_path_buf(),
            source,
        })?;

        let file = tmp.persist(&final_path).map_err(|e| {
            ExecError::io(format!("finalizing {}", final_path.display()), e.error)
        })?;
        let mode = file
            .metadata()
            .map(|m| file_mode(&m))
            .unwrap_or(EXECUTABLE_MODE);
        drop(file);

        Ok(StoredArtifact {
            path: final_path.display().to_string(),
            filename: filename.to_string(),
            file_type,
            mode,
            size,
            sha256,
        })
    }

    fn list(&self, file_type: Option<FileType>) -> Result<Vec<ArtifactInfo>, ExecError> {
        let types: Vec<FileType> = file_type.map_or_else(|| FileType::ALL.to_vec(), |ft| vec![ft]);
        let mut files = Vec::new();
        for ft in types {
            let root = self.root(ft);
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ExecError::io(format!("listing {}", root.display()), e)),
            };
            let mut batch = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| ExecError::io(format!("listing {}", root.display()), e))?;
                let filename = entry.file_name().to_string_lossy().into_owned();
                if filename.starts_with('.') {
                    continue;
                }
                // Entries can vanish between read_dir and stat.
                let Ok(meta) = fs::metadata(entry.path()) else {
                    continue;
                };
                if !meta.is_file() {
                    continue;
                }
                let modified_at = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                batch.push(ArtifactInfo {
                    filename,
                    path: entry.path().display().to_string(),
                    file_type: ft,
                    size: meta.len(),
                    modified_at,
                });
            }
            batch.sort_by(|a, b| a.filename.cmp(&b.filename));
            files.extend(batch);
        }
        Ok(files)
    }

    fn delete(&self, file_type: FileType, name: &str) -> Result<PathBuf, ExecError> {
        let (path, _) = self.locate(file_type, name)?;
        fs::remove_file(&path).map_err(|e| ExecError::io(format!("removing {}", path.display()), e))?;
        tracing::info!(path = %path.display(), "artifact deleted");
        Ok(path)
    }

    fn read(&self, file_type: FileType, name: &str) -> Result<Vec<u8>, ExecError> {
        let (path, _) = self.locate(file_type, name)?;
        fs::read(&path).map_err(|e| ExecError::io(format!("reading {}", path.display()), e))
    }
}
