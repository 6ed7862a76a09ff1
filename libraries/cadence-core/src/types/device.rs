/// Remote playback device domain types
use super::playback_state::DeviceState;
use serde::{Deserialize, Serialize};

/// A device as listed by the remote control API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDevice {
    /// Device identifier used to target commands
    pub id: String,

    /// Display name (e.g., "Cadence Journal Web Player")
    pub name: String,

    /// Whether the device is the account's active playback target
    #[serde(default)]
    pub is_active: bool,

    /// Device kind reported by the API ("Computer", "Smartphone", ...)
    #[serde(rename = "type", default)]
    pub device_type: String,

    /// Volume, when the device reports one
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

/// Events emitted by a device SDK
///
/// The engine only consumes these; it never answers them with commands on the
/// SDK itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SdkEvent {
    /// Device registered and reachable
    Ready {
        /// Id of the registered device
        device_id: String,
    },

    /// Device went offline
    NotReady {
        /// Id of the lost device
        device_id: String,
    },

    /// The SDK could not initialize (unsupported environment, load failure)
    InitializationError {
        /// SDK-provided message
        message: String,
    },

    /// The SDK rejected the access token
    AuthenticationError {
        /// SDK-provided message
        message: String,
    },

    /// The account cannot use the SDK (non-premium)
    AccountError {
        /// SDK-provided message
        message: String,
    },

    /// Playback failed on the device
    PlaybackError {
        /// SDK-provided message
        message: String,
    },

    /// Player state changed; `None` when the device has no current playback
    StateChanged {
        /// New state, if any
        state: Option<DeviceState>,
    },
}

impl SdkEvent {
    /// Event name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::NotReady { .. } => "not_ready",
            Self::InitializationError { .. } => "initialization_error",
            Self::AuthenticationError { .. } => "authentication_error",
            Self::AccountError { .. } => "account_error",
            Self::PlaybackError { .. } => "playback_error",
            Self::StateChanged { .. } => "player_state_changed",
        }
    }
}
