//! Error types for client operations
//!
//! `ApiError` is the body GitLab returns with any non-2xx status. It covers
//! both REST validation errors (`message`, a string or a field map) and OAuth
//! errors (`error` / `error_description`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured error decoded from a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ApiError {
    /// HTTP status of the response
    #[serde(skip)]
    pub status: u16,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ApiError {
    /// Decode a response body. A body that is not JSON is kept as `message`.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let mut api_error = serde_json::from_slice::<ApiError>(body).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            ApiError {
                message: (!text.is_empty()).then_some(serde_json::Value::String(text)),
                ..ApiError::default()
            }
        });
        api_error.status = status;
        api_error
    }

    /// Human-readable description: `error_description`, then `error`, then
    /// `message`, then empty.
    pub fn description(&self) -> String {
        if let Some(desc) = self.error_description.as_deref().filter(|s| !s.is_empty()) {
            return desc.to_owned();
        }
        if let Some(code) = self.error.as_deref().filter(|s| !s.is_empty()) {
            return code.to_owned();
        }
        match &self.message {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(msg)) => msg.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Errors from client operations.
///
/// `Clone` so that one failed token exchange can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("no credential configured")]
    CredentialMissing,

    #[error(transparent)]
    InvalidCredentials(#[from] gitlab_auth::Error),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("{0}")]
    Api(ApiError),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    Encode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The decoded API error, if the server answered with a non-2xx status.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api_error) => Some(api_error),
            _ => None,
        }
    }

    /// Whether the caller's context ended the call (cancel or deadline).
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Timeout)
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_error_prefers_description() {
        let err = ApiError::from_response(
            400,
            br#"{"error":"invalid_grant","error_description":"bad code"}"#,
        );
        assert_eq!(err.status, 400);
        assert_eq!(err.error.as_deref(), Some("invalid_grant"));
        assert_eq!(err.to_string(), "bad code");
        assert_eq!(Error::Api(err).to_string(), "bad code");
    }

    #[test]
    fn oauth_error_without_description_uses_code() {
        let err = ApiError::from_response(401, br#"{"error":"invalid_token"}"#);
        assert_eq!(err.to_string(), "invalid_token");
    }

    #[test]
    fn rest_error_uses_message() {
        let err = ApiError::from_response(404, br#"{"message":"not found"}"#);
        assert_eq!(err.to_string(), "not found");
    }

    #[test]
    fn structured_message_is_stringified() {
        let err = ApiError::from_response(
            400,
            br#"{"message":{"name":["has already been taken"]}}"#,
        );
        assert_eq!(err.to_string(), r#"{"name":["has already been taken"]}"#);
    }

    #[test]
    fn empty_fields_fall_through() {
        let err = ApiError::from_response(
            400,
            br#"{"error":"","error_description":"","message":"fallback"}"#,
        );
        assert_eq!(err.to_string(), "fallback");
    }

    #[test]
    fn unknown_json_shape_renders_empty() {
        let err = ApiError::from_response(500, br#"{"unexpected":true}"#);
        assert_eq!(err.to_string(), "");
    }

    #[test]
    fn non_json_body_becomes_message() {
        let err = ApiError::from_response(502, b"<html>Bad Gateway</html>\n");
        assert_eq!(err.status, 502);
        assert_eq!(err.to_string(), "<html>Bad Gateway</html>");
    }

    #[test]
    fn empty_body_renders_empty() {
        let err = ApiError::from_response(503, b"");
        assert!(err.message.is_none());
        assert_eq!(err.to_string(), "");
    }

    #[test]
    fn credential_errors_pass_through() {
        let err: Error = gitlab_auth::Error::InvalidCredentials("username missing".into()).into();
        assert_eq!(err.to_string(), "invalid credentials: username missing");
    }

    #[test]
    fn interrupted_errors() {
        assert!(Error::Cancelled.is_interrupted());
        assert!(Error::Timeout.is_interrupted());
        assert!(!Error::Transport("reset".into()).is_interrupted());
        assert!(Error::Api(ApiError::default()).api().is_some());
    }
}
