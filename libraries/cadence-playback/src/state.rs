//! Observable player state

use cadence_core::ClipRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of everything a UI needs to render clip playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// A device is registered and ready for commands
    pub is_ready: bool,
    /// A clip was requested and has not started (or failed) yet
    pub is_initializing: bool,
    /// Whether the account may use remote playback; assumed until known
    pub is_premium: bool,
    /// A clip is confirmed playing
    pub is_playing: bool,
    /// The clip most recently requested, until it ends or is paused
    pub current_clip: Option<ClipRequest>,
    /// Position in the track, in milliseconds
    pub position_ms: u64,
    /// Id of the ready device
    pub device_id: Option<String>,
    /// The account must be re-linked before playback works again
    pub needs_reauth: bool,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            is_ready: false,
            is_initializing: false,
            is_premium: true,
            is_playing: false,
            current_clip: None,
            position_ms: 0,
            device_id: None,
            needs_reauth: false,
        }
    }
}

impl PlayerSnapshot {
    /// Back to idle, keeping device and account facts
    pub fn to_idle(&mut self) {
        self.is_initializing = false;
        self.is_playing = false;
        self.current_clip = None;
    }
}

/// Why a clip was paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Explicit pause by the user
    User,
    /// The entry showing the clip was closed or left
    Navigation,
    /// The clip reached its end
    ClipEnded,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Navigation => "navigation",
            Self::ClipEnded => "clip_ended",
        };
        f.write_str(name)
    }
}
