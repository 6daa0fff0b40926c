//! Shared types for the aio artifact execution server and its clients.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod jsonrpc;
pub mod types;

pub use config::{ConfigError, ServerConfig};
pub use jsonrpc::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, RpcId};
pub use types::*;
