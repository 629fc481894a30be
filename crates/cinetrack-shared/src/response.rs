//! Error bodies returned by the backend.

use serde::{Deserialize, Serialize};

/// JSON error body of a non-2xx response.
///
/// Backends disagree on the field name, so both `message` and `error` are
/// accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    /// Parse a response body, returning `None` when it is not a JSON error.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// The human-readable message, if the body carried one.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_preferred() {
        let body = ErrorBody::parse(r#"{"message":"Invalid login","error":"bad"}"#).unwrap();
        assert_eq!(body.message(), Some("Invalid login"));
    }

    #[test]
    fn test_error_field_fallback_and_code() {
        let body = ErrorBody::parse(r#"{"error":"Token expired","code":"token_expired"}"#).unwrap();
        assert_eq!(body.message(), Some("Token expired"));
        assert_eq!(body.code.as_deref(), Some("token_expired"));
    }

    #[test]
    fn test_non_json_body() {
        assert!(ErrorBody::parse("<html>Bad Gateway</html>").is_none());
    }
}
