/// Clip request domain type
use crate::error::{CadenceError, Result};
use serde::{Deserialize, Serialize};

/// Intent to preview the `[clip_start, clip_end)` range of a track
///
/// Immutable once created; a newer request always supersedes the older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    /// Journal entry the clip is attached to
    pub entry_id: String,

    /// Track URI understood by the remote control API
    pub track_uri: String,

    /// Clip start, in seconds from the beginning of the track
    pub clip_start_seconds: f64,

    /// Clip end, in seconds from the beginning of the track
    pub clip_end_seconds: f64,
}

impl ClipRequest {
    /// Create a new clip request
    pub fn new(
        entry_id: impl Into<String>,
        track_uri: impl Into<String>,
        clip_start_seconds: f64,
        clip_end_seconds: f64,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            track_uri: track_uri.into(),
            clip_start_seconds,
            clip_end_seconds,
        }
    }

    /// Clip start offset in milliseconds
    #[must_use]
    pub fn start_ms(&self) -> u64 {
        seconds_to_ms(self.clip_start_seconds)
    }

    /// Clip end offset in milliseconds
    #[must_use]
    pub fn end_ms(&self) -> u64 {
        seconds_to_ms(self.clip_end_seconds)
    }

    /// Length of the clip in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.end_ms().saturating_sub(self.start_ms())
    }

    /// Check that the request describes a non-empty range of a named track
    pub fn validate(&self) -> Result<()> {
        if self.track_uri.trim().is_empty() {
            return Err(CadenceError::invalid_input("track URI cannot be empty"));
        }
        if !self.clip_start_seconds.is_finite() || !self.clip_end_seconds.is_finite() {
            return Err(CadenceError::invalid_input("clip bounds must be finite"));
        }
        if self.clip_start_seconds < 0.0 {
            return Err(CadenceError::invalid_input("clip start cannot be negative"));
        }
        if self.end_ms() <= self.start_ms() {
            return Err(CadenceError::invalid_input(format!(
                "clip end ({}s) must be after clip start ({}s)",
                self.clip_end_seconds, self.clip_start_seconds
            )));
        }
        Ok(())
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * 1000.0).round() as u64
    }
}
