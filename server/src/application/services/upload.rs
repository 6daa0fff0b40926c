//! Upload intake: validate the incoming name, then hand the bytes to the
//! store. Content is stored verbatim.

use std::io::Cursor;

use aio_common::{FileType, StoredArtifact};

use crate::application::ports::ArtifactRepository;
use crate::domain::{ExecError, validate_artifact_name};

/// Validate and persist an uploaded artifact.
///
/// The write runs on a blocking thread so large uploads do not stall the
/// async runtime. `content` is read in place, never copied.
///
/// # Errors
///
/// `InvalidName` for empty, traversing, or reserved names; `Io` from the
/// store.
pub async fn receive<R, C>(
    repo: &R,
    file_type: FileType,
    filename: &str,
    content: C,
) -> Result<StoredArtifact, ExecError>
where
    R: ArtifactRepository + Clone + Send + 'static,
    C: AsRef<[u8]> + Send + 'static,
{
    validate_artifact_name(filename)?;

    let repo = repo.clone();
    let name = filename.to_string();
    let stored = tokio::task::spawn_blocking(move || {
        repo.store(file_type, &name, &mut Cursor::new(content))
    })
    .await
    .map_err(|e| ExecError::io("upload task failed", std::io::Error::other(e)))??;

    tracing::info!(
        file_type = %file_type,
        path = %stored.path,
        size = stored.size,
        sha256 = %stored.sha256,
        "artifact stored"
    );
    Ok(stored)
}
