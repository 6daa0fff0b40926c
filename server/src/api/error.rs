//! Mapping of execution failures onto HTTP responses.
//!
//! Body shape: `{"error": <kind>, "message": <text>, "stderr": <optional>}`.
//! The kind is always named so callers can tell a missing artifact from a
//! crashed or hung one.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::{ErrorKind, ExecError};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    stderr: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
            stderr: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
            stderr: None,
        }
    }

    pub fn multipart(err: &MultipartError) -> Self {
        Self {
            status: err.status(),
            kind: "invalid_upload",
            message: err.body_text(),
            stderr: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidName | ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::Io
        | ErrorKind::TimedOut
        | ErrorKind::OutputTruncated
        | ErrorKind::MalformedResponse
        | ErrorKind::ProtocolViolation
        | ErrorKind::IdMismatch => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ExecError> for ApiError {
    fn from(err: ExecError) -> Self {
        let kind = err.kind();
        Self {
            status: status_for(kind),
            kind: kind.as_str(),
            message: err.to_string(),
            stderr: err.stderr(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, "{}", self.message);
        } else {
            tracing::debug!(kind = self.kind, status = %self.status, "{}", self.message);
        }
        let mut body = json!({
            "error": self.kind,
            "message": self.message,
        });
        if let Some(stderr) = self.stderr {
            body["stderr"] = json!(stderr);
        }
        (self.status, Json(body)).into_response()
    }
}
