//! Request handling and transformation.
//!
//! # Responsibilities
//! - Read the request ID set by the request-id layer
//! - Turn an inbound HTTP request into a [`RequestEnvelope`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Every header value is kept, in arrival order
//! - Header values that are not valid UTF-8 are converted lossily

use axum::http::{request::Parts, HeaderMap};

use crate::bridge::RequestEnvelope;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The request ID, or `"unknown"` when none was set.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the envelope forwarded to a worker.
pub fn envelope_from_parts(parts: &Parts, body: &[u8]) -> RequestEnvelope {
    parts.headers.iter().fold(
        RequestEnvelope::new(parts.method.as_str(), parts.uri.path(), body),
        |envelope, (name, value)| {
            envelope.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()))
        },
    )
}
