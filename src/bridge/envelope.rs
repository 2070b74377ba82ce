//! Request envelope and its wire encoding.
//!
//! A bridged request travels to the worker as one JSON text frame:
//!
//! ```text
//! {"method":"POST","path":"/send_application/","headers":{"Content-Type":["application/json"]},"body":"..."}
//! ```
//!
//! Header names are canonicalized (`content-type` → `Content-Type`) and kept
//! in name order so the encoding is stable. Values keep their arrival order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header name → ordered values.
pub type HeaderMultimap = BTreeMap<String, Vec<String>>;

/// A serialized-ready view of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestEnvelope {
    method: String,
    path: String,
    #[serde(default)]
    headers: HeaderMultimap,
    #[serde(default)]
    body: String,
}

impl RequestEnvelope {
    /// Build an envelope. Body bytes that are not UTF-8 are replaced with U+FFFD.
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: &[u8]) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HeaderMultimap::new(),
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Append a header value under its canonical name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(canonical_header_name(name))
            .or_default()
            .push(value.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMultimap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Encode as the text frame sent to a worker.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a frame produced by [`RequestEnvelope::to_frame`].
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Canonical MIME header form: first letter and each letter after `-` upper-cased.
///
/// Names containing anything other than ASCII alphanumerics and `-` are left as-is.
pub fn canonical_header_name(name: &str) -> String {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let mapped = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            mapped
        })
        .collect()
}
