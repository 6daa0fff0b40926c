//! Unit tests for aio-server
//!
//! These tests use mocked ports and run fast without spawning processes.

mod architecture;
mod mocks;
mod rpc_bridge;
