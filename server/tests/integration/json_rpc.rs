//! JSON-RPC over stdio against real child processes.
//!
//! Most responders rewrite the request line with `sed`, turning
//! `"method":"m","params":X` into `"result":X` so the id comes back as sent.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::Duration;

use aio_common::{FileType, RpcId};
use aio_server::application::ports::ArtifactRepository;
use aio_server::application::services::rpc_bridge::call;
use aio_server::domain::{ErrorKind, ExecError};
use serde_json::json;

use crate::support::Fixture;

const TIMEOUT: Duration = Duration::from_secs(10);

const ECHO_RESULT: &str = r#"sed 's/"method":"m","params":/"result":/'"#;

fn responder(fx: &Fixture, name: &str, body: &str) -> PathBuf {
    fx.script(FileType::Mcp, name, body, 0o755);
    fx.store.resolve(FileType::Mcp, name).expect("resolve")
}

#[tokio::test]
async fn round_trip_returns_params_as_result() {
    let fx = Fixture::new();
    let path = responder(&fx, "echo", ECHO_RESULT);
    let params = json!({"name": "ping", "args": [1, 2, 3]});

    let reply = call(&fx.runner, &path, "m", params.clone(), RpcId::from(7), TIMEOUT)
        .await
        .expect("valid reply");

    assert_eq!(reply.envelope.id, RpcId::from(7));
    assert_eq!(reply.envelope.result(), Some(&params));
    assert_eq!(reply.exit_status, 0);
}

#[tokio::test]
async fn echo_child_round_trips_the_request() {
    let fx = Fixture::new();
    let path = responder(&fx, "cat", "cat");

    let reply = call(&fx.runner, &path, "m", json!({}), RpcId::from(7), TIMEOUT)
        .await
        .expect("echoed request is a valid envelope");

    assert_eq!(reply.envelope.id, RpcId::from(7));
    assert_eq!(
        reply.envelope.body,
        json!({"jsonrpc": "2.0", "method": "m", "params": {}, "id": 7})
    );
}

#[tokio::test]
async fn string_ids_round_trip_too() {
    let fx = Fixture::new();
    let path = responder(&fx, "echo", ECHO_RESULT);

    let reply = call(&fx.runner, &path, "m", json!({}), RpcId::from("req-1"), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(reply.envelope.body["id"], "req-1");
}

#[tokio::test]
async fn rewritten_id_is_a_mismatch() {
    let fx = Fixture::new();
    let path = responder(
        &fx,
        "liar",
        r#"sed -e 's/"method":"m","params":/"result":/' -e 's/"id":7}/"id":8}/'"#,
    );

    let err = call(&fx.runner, &path, "m", json!({}), RpcId::from(7), TIMEOUT)
        .await
        .unwrap_err();

    let ExecError::IdMismatch { expected, actual, .. } = err else {
        panic!("expected IdMismatch, got {err:?}");
    };
    assert_eq!(expected, RpcId::from(7));
    assert_eq!(actual, "8");
}

#[tokio::test]
async fn plain_text_output_is_malformed_and_keeps_stderr() {
    let fx = Fixture::new();
    let path = responder(&fx, "chatty", "cat >/dev/null\necho 'not json'\necho 'diag line' >&2");

    let err = call(&fx.runner, &path, "m", json!({}), RpcId::default(), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert_eq!(err.stderr().as_deref(), Some("diag line\n"));
}

#[tokio::test]
async fn error_envelope_passes_validation() {
    let fx = Fixture::new();
    let path = responder(
        &fx,
        "refuser",
        r#"cat >/dev/null
printf '{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":1}\n'"#,
    );

    let reply = call(&fx.runner, &path, "nope", json!({}), RpcId::default(), TIMEOUT)
        .await
        .unwrap();

    assert!(reply.envelope.is_error());
    assert_eq!(reply.envelope.error().unwrap().code, -32601);
}

#[tokio::test]
async fn hung_server_times_out_instead_of_blocking() {
    let fx = Fixture::new();
    let path = responder(&fx, "mute", "sleep 30");

    let err = call(
        &fx.runner,
        &path,
        "m",
        json!({}),
        RpcId::default(),
        Duration::from_millis(500),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TimedOut);
}
