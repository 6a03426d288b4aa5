//! Tagged response envelope and JSONP rendering.
//!
//! Every operation answers with `{ "type": "success", "value": ... }` or
//! `{ "type": "error", "name": ..., "message": ... }` at HTTP 200: the
//! envelope's `type` tag is the status channel. JSONP callers evaluate the
//! body as a script and never see status codes or headers, so nothing may be
//! signalled through them.

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

/// The two response shapes.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        value: Value,
    },
    Error {
        name: String,
        message: String,
        /// Kept for wire compatibility; never populated.
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl Envelope {
    pub fn success(value: Value) -> Self {
        Envelope::Success { value }
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Envelope::Error {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Render as plain JSON or, when a callback name is present, as a JSONP
    /// script invoking it.
    ///
    /// The callback name is embedded verbatim: this endpoint serves a trusted
    /// personal deployment and does not sanitize it beyond JSON-encoding the
    /// body it wraps.
    pub fn into_response_with(self, callback: Option<&str>) -> Response {
        let json = serde_json::to_string(&self).unwrap_or_else(|err| {
            tracing::error!(error = %err, "envelope serialization failed");
            r#"{"type":"error","name":"unknown error","message":"response serialization failed"}"#
                .to_string()
        });
        match callback {
            Some(name) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/javascript; charset=utf-8"),
                )],
                format!("{name}({json})"),
            )
                .into_response(),
            None => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                json,
            )
                .into_response(),
        }
    }
}
