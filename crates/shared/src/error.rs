//! Error types shared by the codec and the HTTP collaborator client.

use serde::Deserialize;
use thiserror::Error;

/// Why an inbound frame could not be turned into an event.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("unknown control frame type `{0}`")]
    UnknownControl(String),
    #[error("malformed {kind} frame: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("file message `{0}` carries no file_info")]
    MissingFileInfo(String),
    #[error("failed to serialize outbound frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Error body returned by the chat API, e.g. `{"detail": "Chat not found"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    title: Option<String>,
}

/// Extract a user-facing message from an API error body.
/// Prefers a string `detail`, falls back to `title`.
pub fn try_error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    if let Some(serde_json::Value::String(detail)) = parsed.detail {
        if !detail.trim().is_empty() {
            return Some(detail);
        }
    }
    parsed.title.filter(|title| !title.trim().is_empty())
}

/// Failure talking to the room-creation API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl ApiError {
    /// Text suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { body, status } => {
                try_error_detail(body).unwrap_or_else(|| format!("Request failed ({status})"))
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_preferred() {
        let body = r#"{"detail":"Chat room is full","title":"Conflict"}"#;
        assert_eq!(try_error_detail(body).as_deref(), Some("Chat room is full"));
    }

    #[test]
    fn structured_detail_falls_back_to_title() {
        let body = r#"{"detail":[{"loc":["body"],"msg":"field required"}],"title":"Bad Request"}"#;
        assert_eq!(try_error_detail(body).as_deref(), Some("Bad Request"));
        assert_eq!(try_error_detail("<html>"), None);
    }

    #[test]
    fn http_error_user_message() {
        let err = ApiError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.user_message(), "Request failed (502)");
    }
}
