//! Unit tests for the JSON-RPC stdio bridge.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use aio_common::RpcId;
use aio_server::application::services::rpc_bridge::call;
use aio_server::domain::{ErrorKind, ExecError, ExecutionResult};
use serde_json::{Value, json};

use crate::mocks::{ScriptedRunner, exited};

const TIMEOUT: Duration = Duration::from_secs(2);

async fn call_with(runner: &ScriptedRunner, id: RpcId) -> Result<Value, ExecError> {
    call(runner, Path::new("/mem/mcp/srv"), "ping", json!({"x": 1}), id, TIMEOUT)
        .await
        .map(|reply| reply.envelope.body)
}

#[tokio::test]
async fn result_envelope_is_returned_verbatim() {
    let runner = ScriptedRunner::replying(
        b"{\"jsonrpc\":\"2.0\",\"result\":{\"pong\":true},\"id\":7,\"extra\":\"kept\"}\n",
    );

    let body = call_with(&runner, RpcId::from(7)).await.expect("valid reply");

    assert_eq!(
        body,
        json!({"jsonrpc": "2.0", "result": {"pong": true}, "id": 7, "extra": "kept"})
    );
}

#[tokio::test]
async fn error_envelope_is_a_successful_call() {
    let runner = ScriptedRunner::replying(
        br#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"no such method"},"id":1}"#,
    );

    let reply = call(&runner, Path::new("/x"), "nope", json!({}), RpcId::default(), TIMEOUT)
        .await
        .expect("error envelope still validates");

    assert!(reply.envelope.is_error());
    let err = reply.envelope.error().expect("typed error");
    assert_eq!(err.code, -32601);
    assert_eq!(err.message, "no such method");
}

#[tokio::test]
async fn request_carries_method_params_and_id() {
    let runner = ScriptedRunner::replying(br#"{"jsonrpc":"2.0","result":null,"id":"q"}"#);

    call_with(&runner, RpcId::from("q")).await.unwrap();

    let stdin = runner.only_call().stdin.expect("stdin");
    let sent: Value = serde_json::from_slice(&stdin).unwrap();
    assert_eq!(
        sent,
        json!({"jsonrpc": "2.0", "method": "ping", "params": {"x": 1}, "id": "q"})
    );
}

#[tokio::test]
async fn non_json_stdout_is_malformed_with_stderr_kept() {
    let runner = ScriptedRunner::new(|_| Ok(exited(0, b"hello world\n", b"debug: starting")));

    let err = call_with(&runner, RpcId::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert_eq!(err.stderr().as_deref(), Some("debug: starting"));
}

#[tokio::test]
async fn empty_stdout_is_malformed() {
    let runner = ScriptedRunner::new(|_| Ok(exited(1, b"", b"crashed")));

    let err = call_with(&runner, RpcId::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn wrong_version_is_a_protocol_violation() {
    let runner = ScriptedRunner::replying(br#"{"jsonrpc":"1.0","result":1,"id":1}"#);

    let err = call_with(&runner, RpcId::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
}

#[tokio::test]
async fn shape_is_checked_before_id() {
    // Both problems present: the envelope shape wins.
    let runner = ScriptedRunner::replying(br#"{"jsonrpc":"2.0","id":99}"#);

    let err = call_with(&runner, RpcId::from(1)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
}

#[tokio::test]
async fn id_mismatch_reports_both_ids() {
    let runner = ScriptedRunner::replying(br#"{"jsonrpc":"2.0","result":{},"id":8}"#);

    let err = call_with(&runner, RpcId::from(7)).await.unwrap_err();

    match err {
        ExecError::IdMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, RpcId::from(7));
            assert_eq!(actual, "8");
        }
        other => panic!("expected IdMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn string_id_does_not_match_numeric_id() {
    let runner = ScriptedRunner::replying(br#"{"jsonrpc":"2.0","result":{},"id":"7"}"#);

    let err = call_with(&runner, RpcId::from(7)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IdMismatch);
}

#[tokio::test]
async fn truncated_stdout_is_not_parsed() {
    let runner = ScriptedRunner::new(|_| {
        Ok(ExecutionResult {
            stdout: br#"{"jsonrpc":"2.0","result":"#.to_vec(),
            stdout_truncated: true,
            ..ExecutionResult::default()
        })
    });

    let err = call_with(&runner, RpcId::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OutputTruncated);
}

#[tokio::test]
async fn runner_failure_is_not_reinterpreted() {
    let runner = ScriptedRunner::new(|spec| {
        Err(ExecError::TimedOut {
            path: spec.program.clone(),
            timeout: spec.timeout,
            partial: Box::default(),
        })
    });

    let err = call_with(&runner, RpcId::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TimedOut);
}
