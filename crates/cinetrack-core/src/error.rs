//! Error taxonomy shared by every layer that talks to the backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request never produced an HTTP response.
    Network,
    /// 401-class response.
    Authentication,
    /// 403-class response.
    Permission,
    /// 404-class response.
    NotFound,
    /// 429-class response.
    RateLimited,
    /// 5xx-class response.
    Server,
    /// No connectivity was detected locally, so nothing was sent.
    Offline,
    Unknown,
}

impl ErrorKind {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Permission,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        }
    }
}

/// A failed backend call.
///
/// Displays as the message alone so that server-provided messages reach the
/// caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    /// HTTP status, absent for network and offline failures.
    pub status: Option<u16>,
    pub message: String,
    /// Optional machine-readable code from the error body.
    pub code: Option<String>,
}

impl ApiError {
    /// Build an error from an HTTP response status.
    pub fn http(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            status: Some(status),
            message: message.into(),
            code,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            status: None,
            message: message.into(),
            code: None,
        }
    }

    pub fn offline() -> Self {
        Self {
            kind: ErrorKind::Offline,
            status: None,
            message: "You are offline".to_string(),
            code: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            status: None,
            message: message.into(),
            code: None,
        }
    }

    /// True when the failure came from missing connectivity rather than from
    /// the server rejecting the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::Offline)
    }

    /// Generic user-facing message for a status when the body carried none.
    pub fn default_message(status: u16) -> String {
        match status {
            400 => "Bad request".to_string(),
            401 => "Authentication required".to_string(),
            403 => "Permission denied".to_string(),
            404 => "Resource not found".to_string(),
            409 => "Conflict".to_string(),
            422 => "Validation failed".to_string(),
            429 => "Too many requests".to_string(),
            500..=599 => "Server error".to_string(),
            _ => format!("Request failed with status {status}"),
        }
    }
}
