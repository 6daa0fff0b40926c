//! Domain layer: pure types plus validation and protocol rules.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `crate::api`, `tokio`, `std::fs`, or `std::process`. All functions are
//! synchronous and take data in, returning data out.

pub mod artifact;
pub mod error;
pub mod execution;
pub mod rpc;

pub use artifact::{ArtifactRef, candidate_names, needs_exec_bit, validate_artifact_name};
pub use error::{ErrorKind, ExecError};
pub use execution::{ExecutionMode, ExecutionRequest, ExecutionResult};
pub use rpc::{RpcEnvelope, decode_response, encode_request};
