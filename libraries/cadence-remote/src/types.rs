//! Types for token service and remote control API requests and responses.

use cadence_core::{DeviceState, RemoteDevice};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the remote control API client.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the API (e.g., "https://api.music.example.com/v1")
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Create a config with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration for the token service client.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Base URL of the journal backend that holds the account link
    pub url: String,
    /// Session token of the signed-in journal user
    pub session_token: Option<String>,
}

impl TokenServiceConfig {
    /// Create a config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_token: None,
        }
    }

    /// Create a config for a signed-in user.
    pub fn with_session(url: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_token: Some(session_token.into()),
        }
    }
}

// =============================================================================
// Remote Control Types
// =============================================================================

/// Response of `GET /me/player/devices`.
#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<RemoteDevice>,
}

/// Body of `PUT /me/player`.
#[derive(Debug, Serialize)]
pub(crate) struct TransferRequest<'a> {
    pub device_ids: [&'a str; 1],
    pub play: bool,
}

/// Body of `PUT /me/player/play`.
#[derive(Debug, Serialize)]
pub(crate) struct PlayRequest<'a> {
    pub uris: [&'a str; 1],
    pub position_ms: u64,
}

/// Response of `GET /me/player`.
#[derive(Debug, Deserialize)]
pub(crate) struct PlayerStateResponse {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<PlayerItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerItem {
    pub uri: String,
}

impl From<PlayerStateResponse> for DeviceState {
    fn from(response: PlayerStateResponse) -> Self {
        Self {
            paused: !response.is_playing,
            position_ms: response.progress_ms.unwrap_or(0),
            track_uri: response.item.map(|item| item.uri),
        }
    }
}

/// Error body returned by the remote control API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}
