//! Use-case services composed from the application ports.

pub mod execute;
pub mod rpc_bridge;
pub mod upload;
