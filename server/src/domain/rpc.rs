//! JSON-RPC framing and response validation.
//!
//! Framing is "one JSON document on a single line, then end-of-input".
//! Validation runs in a fixed order so the reported failure is always the
//! most fundamental one: parse, then envelope shape, then id correlation.

use aio_common::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, RpcId};
use serde_json::{Map, Value};

use crate::domain::error::ExecError;

/// A validated response envelope. `body` is the child's object verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcEnvelope {
    pub id: RpcId,
    pub body: Value,
}

impl RpcEnvelope {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.body.get("error").is_some()
    }

    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.body.get("result")
    }

    #[must_use]
    pub fn error(&self) -> Option<JsonRpcError> {
        self.body
            .get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
    }
}

/// Serialize `request` as a single newline-terminated line.
pub fn encode_request(request: &JsonRpcRequest) -> Result<Vec<u8>, ExecError> {
    let mut line = serde_json::to_vec(request).map_err(|e| ExecError::ProtocolViolation {
        detail: format!("request could not be serialized: {e}"),
        stderr: String::new(),
    })?;
    line.push(b'\n');
    Ok(line)
}

/// Parse and validate the child's stdout against the request id.
pub fn decode_response(
    stdout: &[u8],
    expected: &RpcId,
    stderr: &str,
) -> Result<RpcEnvelope, ExecError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Err(ExecError::MalformedResponse {
            detail: "child produced no output".to_string(),
            stderr: stderr.to_string(),
        });
    }

    let value: Value =
        serde_json::from_slice(stdout).map_err(|e| ExecError::MalformedResponse {
            detail: e.to_string(),
            stderr: stderr.to_string(),
        })?;

    let protocol = |detail: &str| ExecError::ProtocolViolation {
        detail: detail.to_string(),
        stderr: stderr.to_string(),
    };

    let Value::Object(obj) = &value else {
        return Err(protocol("response is not a JSON object"));
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(protocol("missing or unsupported \"jsonrpc\" version"));
    }
    check_payload(obj).map_err(protocol)?;

    match obj.get("id") {
        Some(id) if expected.matches(id) => Ok(RpcEnvelope {
            id: expected.clone(),
            body: value,
        }),
        Some(id) => Err(ExecError::IdMismatch {
            expected: expected.clone(),
            actual: id.to_string(),
            stderr: stderr.to_string(),
        }),
        None => Err(ExecError::IdMismatch {
            expected: expected.clone(),
            actual: "<missing>".to_string(),
            stderr: stderr.to_string(),
        }),
    }
}

/// A response carries `result` or `error`; a child that echoes its request
/// back carries `method` instead, which is accepted as-is.
fn check_payload(obj: &Map<String, Value>) -> Result<(), &'static str> {
    match (obj.get("result"), obj.get("error")) {
        (None, None) if obj.get("method").is_some_and(Value::is_string) => Ok(()),
        (None, None) => Err("response has none of \"result\", \"error\" or \"method\""),
        (Some(_), Some(_)) => Err("response has both \"result\" and \"error\""),
        (Some(_), None) => Ok(()),
        (None, Some(error)) => {
            let code_ok = error.get("code").is_some_and(Value::is_i64);
            let message_ok = error.get("message").is_some_and(Value::is_string);
            if code_ok && message_ok {
                Ok(())
            } else {
                Err("\"error\" must be an object with integer \"code\" and string \"message\"")
            }
        }
    }
}
