//! Response mapping.
//!
//! # Responsibilities
//! - Return worker replies as the HTTP body, untouched
//! - Map dispatch errors to status codes and short text bodies
//!
//! # Design Decisions
//! - Empty pool is 503, worker failures are 500
//! - Worker deadline expiry results in 504 Gateway Timeout
//! - No structured error body; callers get plain text

use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::bridge::DispatchError;

/// Status code and body text for a failed call.
pub fn error_parts(error: &DispatchError) -> (StatusCode, &'static str) {
    match error {
        DispatchError::NoWorkerAvailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "No WebSocket connections available",
        ),
        DispatchError::SerializationFailed(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize request")
        }
        DispatchError::ForwardFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to forward message")
        }
        DispatchError::ReplyFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read response message")
        }
        DispatchError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "Worker did not reply in time"),
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        error_parts(&self).into_response()
    }
}

/// A successful bridged reply.
pub fn reply_response(reply: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], reply).into_response()
}
