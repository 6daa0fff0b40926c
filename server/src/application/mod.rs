//! Application layer: port traits and use-case services.
//!
//! Imports only from `crate::domain`. All I/O is routed through the
//! injected [`ports::ArtifactRepository`] and [`ports::ProcessRunner`].

pub mod ports;
pub mod services;
