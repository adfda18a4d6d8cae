//! HTTP error taxonomy and server error payloads.
//!
//! ERROR HANDLING
//! ==============
//! Every non-2xx response becomes `HttpError::Status` carrying the server's
//! JSON payload untouched. Callers pick what to show: `detail` for generic
//! failures, `field_errors` for form validation.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::storage::StorageError;

/// Structured error body returned by the API, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorPayload(Value);

impl ErrorPayload {
    /// Parse a response body. Non-JSON bodies are kept as a JSON string.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self(Value::Null);
        }
        Self(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_owned())))
    }

    /// Payload with only a `detail` message, for failures that never reached
    /// the server.
    #[must_use]
    pub fn from_detail(detail: impl Into<String>) -> Self {
        Self(serde_json::json!({ "detail": detail.into() }))
    }

    /// The human-readable message: `detail`, then `error`, then a bare string body.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match &self.0 {
            Value::Object(map) => map
                .get("detail")
                .or_else(|| map.get("error"))
                .and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Field-level validation messages, e.g. `{"email": ["already taken"]}`.
    #[must_use]
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let Value::Object(map) = &self.0 else {
            return BTreeMap::new();
        };
        map.iter()
            .filter(|(field, _)| field.as_str() != "detail" && field.as_str() != "error")
            .filter_map(|(field, value)| {
                let messages: Vec<String> = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect(),
                    _ => return None,
                };
                (!messages.is_empty()).then(|| (field.clone(), messages))
            })
            .collect()
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Failure raised by a [`Transport`](crate::net::transport::Transport) when
/// no response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// No response was received.
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16, payload: ErrorPayload },

    /// The request body could not be serialized.
    #[error("request encode failed: {0}")]
    Encode(String),

    /// A success response could not be deserialized.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// Token storage failed while preparing or recovering the request.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl HttpError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    #[must_use]
    pub fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Status { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The server payload, or a synthesized `detail` for local failures.
    #[must_use]
    pub fn into_payload(self) -> ErrorPayload {
        match self {
            Self::Status { payload, .. } => payload,
            other => ErrorPayload::from_detail(other.to_string()),
        }
    }

    /// Message suitable for display: the server's `detail` or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.payload()
            .and_then(ErrorPayload::detail)
            .unwrap_or(fallback)
            .to_owned()
    }
}
