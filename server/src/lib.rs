//! aio-server library: exposes the execution layers for integration testing.
//!
//! Layering: `domain` (pure rules) ← `application` (ports and services) ←
//! `infra` (filesystem, processes) ← `api` (HTTP).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod api;
pub mod application;
pub mod domain;
pub mod infra;
pub mod logging;
