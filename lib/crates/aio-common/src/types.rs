use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of an uploaded executable. Each variant owns one artifact
/// directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Agent,
    Mcp,
}

impl FileType {
    pub const ALL: [FileType; 2] = [FileType::Agent, FileType::Mcp];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Agent => "agent",
            FileType::Mcp => "mcp",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown file type '{0}': expected 'agent' or 'mcp'")]
pub struct UnknownFileType(pub String);

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(FileType::Agent),
            "mcp" => Ok(FileType::Mcp),
            other => Err(UnknownFileType(other.to_string())),
        }
    }
}

/// An artifact persisted by the store. Returned from uploads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredArtifact {
    pub path: String,
    pub filename: String,
    pub file_type: FileType,
    /// Permission bits after the upload completed (normally `0o755`).
    pub mode: u32,
    pub size: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
}

/// Listing entry for an artifact found on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub path: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}
