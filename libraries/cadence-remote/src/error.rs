//! Error types for the remote playback clients.

use cadence_core::CadenceError;
use thiserror::Error;

/// Errors that can occur when talking to the token service or the remote control API.
#[derive(Error, Debug)]
pub enum RemoteClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Access token rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Account cannot use the remote play endpoint (403)
    #[error("Premium account required")]
    PremiumRequired,

    /// Device unknown to the remote API (404)
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Rate limited by server (429)
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// No access token could be obtained for the request
    #[error("No access token: {0}")]
    Token(CadenceError),
}

/// Classify a transport error from `send()`.
pub(crate) fn map_send_error(e: reqwest::Error) -> RemoteClientError {
    if e.is_connect() || e.is_timeout() {
        RemoteClientError::ServerUnreachable(e.to_string())
    } else {
        RemoteClientError::Request(e)
    }
}

impl From<RemoteClientError> for CadenceError {
    fn from(err: RemoteClientError) -> Self {
        match err {
            RemoteClientError::Unauthorized(msg) => CadenceError::Unauthorized(msg),
            RemoteClientError::PremiumRequired => CadenceError::PremiumRequired,
            RemoteClientError::DeviceNotFound(msg) => CadenceError::DeviceNotFound(msg),
            RemoteClientError::RateLimited { retry_after_secs } => {
                CadenceError::RateLimited { retry_after_secs }
            }
            RemoteClientError::ServerError { status, message } => {
                CadenceError::Api { status, message }
            }
            RemoteClientError::Token(inner) => inner,
            RemoteClientError::InvalidUrl(msg) => CadenceError::InvalidInput(msg),
            RemoteClientError::ParseError(msg) => CadenceError::Api {
                status: 200,
                message: msg,
            },
            RemoteClientError::ServerUnreachable(msg) => CadenceError::Network(msg),
            RemoteClientError::Request(e) => CadenceError::Network(e.to_string()),
        }
    }
}

/// Result type for remote client operations.
pub type Result<T> = std::result::Result<T, RemoteClientError>;
