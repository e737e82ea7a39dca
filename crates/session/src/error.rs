//! Session error types

use anidex_http::ClientError;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The API call itself failed; session state is untouched
    #[error(transparent)]
    Api(#[from] ClientError),

    /// The access token could not be decoded; the session was torn down
    #[error("Access token is malformed: {0}")]
    InvalidToken(#[from] TokenError),

    /// Profile lookup answered 401/404 or never answered; the session was torn down
    #[error("Profile lookup rejected the session: {0}")]
    ProfileRejected(ClientError),

    /// The session was reset while this operation was in flight
    #[error("Session was reset while the operation was in flight")]
    Superseded,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a failed refresh, shared by every caller awaiting it
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("No refresh token cookie is present")]
    MissingRefreshToken,

    #[error("Refresh request failed: {0}")]
    Request(Arc<ClientError>),

    #[error("Refreshed token was rejected: {0}")]
    Rejected(String),

    #[error("Session was reset while refreshing")]
    Superseded,

    #[error("Refresh task aborted")]
    Aborted,
}

/// Why an access token could not be decoded
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("expected three dot-separated segments")]
    Shape,

    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not a JSON claims object: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Durable storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}
