/// Device playback state types
use serde::{Deserialize, Serialize};

/// Lifecycle of the registered playback device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No device has been created for this session
    #[default]
    Uninitialized,
    /// Device created, waiting for the SDK to report a device id
    Connecting,
    /// Device id known; commands may target it
    Ready,
    /// Device lost or failed to initialize
    NotReady,
    /// Device torn down (credential rotation, sign-out)
    Disconnected,
}

impl ConnectionState {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::NotReady => "not_ready",
            Self::Disconnected => "disconnected",
        }
    }

    /// Whether a new device must be created before the next command
    #[must_use]
    pub fn needs_creation(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::NotReady | Self::Disconnected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Player state as reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Whether playback is paused
    pub paused: bool,

    /// Position in the current track, in milliseconds
    pub position_ms: u64,

    /// URI of the current track, if the device reports one
    pub track_uri: Option<String>,
}

impl DeviceState {
    /// Whether the reported track is `uri`
    pub fn is_track(&self, uri: &str) -> bool {
        self.track_uri.as_deref() == Some(uri)
    }
}
