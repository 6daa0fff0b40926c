//! Artifact naming rules: no I/O.
//!
//! Names are flat file names inside one of the two artifact roots. Anything
//! that could address a different directory is rejected here, before a path
//! is ever joined or touched.

use std::path::{Component, Path};

use aio_common::FileType;

use crate::domain::error::ExecError;

/// Suffix tried first during resolution.
pub const BIN_SUFFIX: &str = ".bin";

/// Mode applied to stored and repaired artifacts (owner rwx, group/other rx).
pub const EXECUTABLE_MODE: u32 = 0o755;

const OWNER_EXEC: u32 = 0o100;

/// Longest accepted name, leaving room for the `.bin` suffix under NAME_MAX.
pub const MAX_NAME_LEN: usize = 250;

/// Logical address of an artifact: category plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub file_type: FileType,
    pub logical_name: String,
}

impl ArtifactRef {
    #[must_use]
    pub fn new(file_type: FileType, logical_name: impl Into<String>) -> Self {
        Self {
            file_type,
            logical_name: logical_name.into(),
        }
    }
}

/// Validate a logical or upload file name.
///
/// Rejects empty names, separators, NUL bytes, any `..` sequence, and names
/// starting with `.` (reserved for in-flight upload temp files, which must
/// never be resolvable).
pub fn validate_artifact_name(name: &str) -> Result<(), ExecError> {
    if name.is_empty() {
        return Err(ExecError::invalid_name(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ExecError::invalid_name(name, "name is too long"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ExecError::invalid_name(name, "name contains a path separator"));
    }
    if name.contains('\0') {
        return Err(ExecError::invalid_name(name, "name contains a NUL byte"));
    }
    if name.contains("..") {
        return Err(ExecError::invalid_name(name, "name contains a parent-directory sequence"));
    }
    if name.starts_with('.') {
        return Err(ExecError::invalid_name(name, "names starting with '.' are reserved"));
    }
    Ok(())
}

/// Candidate file names for a logical name, in precedence order.
#[must_use]
pub fn candidate_names(logical_name: &str) -> [String; 2] {
    [format!("{logical_name}{BIN_SUFFIX}"), logical_name.to_string()]
}

/// `true` if `candidate` is exactly one normal component below `root`.
#[must_use]
pub fn is_directly_inside(root: &Path, candidate: &Path) -> bool {
    let Ok(rest) = candidate.strip_prefix(root) else {
        return false;
    };
    let mut components = rest.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `true` when the owner execute bit is missing from `mode`.
#[must_use]
pub fn needs_exec_bit(mode: u32) -> bool {
    mode & OWNER_EXEC == 0
}
