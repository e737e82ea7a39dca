//! Client error types

use serde::Deserialize;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Request rejected by server-side validation
    #[error("Validation failed ({status}): {detail}")]
    Validation { status: u16, detail: String },

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Upload exceeded the server's size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload had a content type the server refuses
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL could not be built from the base URL and path
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// FastAPI-style error body: `{"detail": "..."}` or `{"detail": [{"msg": "..."}]}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ClientError {
    /// Create error from HTTP status code and the raw response body
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = extract_detail(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });

        match status.as_u16() {
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            413 => Self::PayloadTooLarge(message),
            415 => Self::UnsupportedMediaType(message),
            code @ 400..=499 => Self::Validation {
                status: code,
                detail: message,
            },
            code => Self::ServerError {
                status: code,
                message,
            },
        }
    }

    /// HTTP status carried by this error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::PayloadTooLarge(_) => Some(413),
            Self::UnsupportedMediaType(_) => Some(415),
            Self::Validation { status, .. } | Self::ServerError { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the server rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Whether the server reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the request never got a response (connect failure, timeout, reset)
    pub fn is_network(&self) -> bool {
        match self {
            Self::Request(e) => {
                e.status().is_none() && (e.is_connect() || e.is_timeout() || e.is_request())
            }
            _ => false,
        }
    }

    /// Message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            Self::PayloadTooLarge(_) => "The file is too large to upload.".to_string(),
            Self::UnsupportedMediaType(_) => "This file type is not supported.".to_string(),
            Self::Validation { detail, .. } => detail.clone(),
            Self::AuthenticationFailed(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::NotFound(detail) => detail.clone(),
            e if e.is_network() => {
                "Cannot reach the server. Check your internet connection.".to_string()
            }
            Self::ServerError { status, .. } if *status >= 500 => {
                "The server is temporarily unavailable. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
