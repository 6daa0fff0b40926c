//! Infrastructure layer: concrete implementations of application ports.
//!
//! All filesystem and process I/O lives here. Imports from `crate::domain`
//! and `crate::application::ports` are allowed; `crate::api` is not.

pub mod artifact_store;
pub mod process_runner;

pub use artifact_store::FsArtifactStore;
pub use process_runner::TokioProcessRunner;
