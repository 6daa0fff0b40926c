//! JSON-RPC 2.0 wire types shared between the server and its clients.
//!
//! Only the request side is fully typed. Responses produced by executed
//! artifacts are relayed verbatim, so the server validates them as raw
//! `serde_json::Value`s and never re-serializes them through a struct.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Request correlation id. JSON-RPC allows strings and numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
}

impl RpcId {
    /// Compare against an id taken from an untyped JSON document.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (RpcId::Number(n), Value::Number(v)) => v.as_i64() == Some(*n),
            (RpcId::String(s), Value::String(v)) => s == v,
            _ => false,
        }
    }
}

impl Default for RpcId {
    fn default() -> Self {
        RpcId::Number(1)
    }
}

impl From<i64> for RpcId {
    fn from(n: i64) -> Self {
        RpcId::Number(n)
    }
}

impl From<&str> for RpcId {
    fn from(s: &str) -> Self {
        RpcId::String(s.to_string())
    }
}

impl From<String> for RpcId {
    fn from(s: String) -> Self {
        RpcId::String(s)
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{n}"),
            RpcId::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A JSON-RPC 2.0 request object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default = "empty_params")]
    pub params: Value,
    #[serde(default)]
    pub id: RpcId,
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value, id: RpcId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: if params.is_null() { empty_params() } else { params },
            id,
        }
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
