//! Playback policy: every tunable timing of the engine
//!
//! The auto-pause and registration-lag behaviors these values compensate for
//! are quirks of the remote device, so they are policy rather than protocol.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Host platform, which decides how much one input gesture may accomplish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// One gesture unlocks audio, creates the device and plays
    #[default]
    Desktop,
    /// The first gesture may only unlock and create the device; a second plays
    Mobile,
}

/// Timing policy for device activation, stabilization and clip scheduling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackPolicy {
    /// Host platform
    pub platform: Platform,

    /// Name the playback device registers under
    pub device_name: String,

    /// Interval between "list devices" polls during the handshake (ms)
    pub handshake_poll_interval_ms: u64,

    /// Handshake deadline (ms)
    pub handshake_deadline_ms: u64,

    /// Handshake deadline during the cold-start window (ms)
    pub cold_start_handshake_deadline_ms: u64,

    /// How long after sign-in the extended deadline applies (ms)
    pub cold_start_window_ms: u64,

    /// How long a confirmed activation is trusted (ms)
    pub activation_cache_ttl_ms: u64,

    /// Sustained unpaused time that confirms a genuine start (ms)
    pub stabilization_window_ms: u64,

    /// Position advance that confirms a genuine start early (ms)
    pub min_position_advance_ms: u64,

    /// A pause this soon after the first unpaused event may be a glitch (ms)
    pub glitch_window_ms: u64,

    /// Position drift still counted as "unchanged" (ms)
    pub glitch_position_tolerance_ms: u64,

    /// A first unpaused report this far from the clip start belongs to another play (ms)
    pub start_position_tolerance_ms: u64,

    /// Backoff before each glitch retry (ms); its length caps the retries
    pub retry_backoff_ms: Vec<u64>,

    /// Delay before the single retry of a "device not found" play (ms)
    pub not_found_retry_delay_ms: u64,

    /// Interval of clip progress updates (ms)
    pub progress_tick_ms: u64,

    /// Credentials are refreshed this long before they expire (ms)
    pub credential_refresh_margin_ms: u64,
}

/// Upper bound on glitch retries per command, whatever the backoff list says
pub const MAX_GLITCH_RETRIES: usize = 3;

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            platform: Platform::Desktop,
            device_name: "Cadence Journal".to_string(),
            handshake_poll_interval_ms: 100,
            handshake_deadline_ms: 2_000,
            cold_start_handshake_deadline_ms: 5_000,
            cold_start_window_ms: 30_000,
            activation_cache_ttl_ms: 10_000,
            stabilization_window_ms: 500,
            min_position_advance_ms: 250,
            glitch_window_ms: 1_000,
            glitch_position_tolerance_ms: 100,
            start_position_tolerance_ms: 2_000,
            retry_backoff_ms: vec![300, 600, 1_200],
            not_found_retry_delay_ms: 1_000,
            progress_tick_ms: 250,
            credential_refresh_margin_ms: 60_000,
        }
    }
}

impl PlaybackPolicy {
    pub fn handshake_poll_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_poll_interval_ms)
    }

    /// Handshake deadline, extended while `cold_start` is set
    pub fn handshake_deadline(&self, cold_start: bool) -> Duration {
        if cold_start {
            Duration::from_millis(self.cold_start_handshake_deadline_ms)
        } else {
            Duration::from_millis(self.handshake_deadline_ms)
        }
    }

    pub fn cold_start_window(&self) -> Duration {
        Duration::from_millis(self.cold_start_window_ms)
    }

    pub fn activation_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.activation_cache_ttl_ms)
    }

    pub fn stabilization_window(&self) -> Duration {
        Duration::from_millis(self.stabilization_window_ms)
    }

    pub fn glitch_window(&self) -> Duration {
        Duration::from_millis(self.glitch_window_ms)
    }

    pub fn not_found_retry_delay(&self) -> Duration {
        Duration::from_millis(self.not_found_retry_delay_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.max(1))
    }

    pub fn credential_refresh_margin(&self) -> Duration {
        Duration::from_millis(self.credential_refresh_margin_ms)
    }

    /// Maximum glitch retries per command
    pub fn max_glitch_retries(&self) -> usize {
        self.retry_backoff_ms.len().min(MAX_GLITCH_RETRIES)
    }

    /// Backoff before retry number `attempt` (1-based)
    ///
    /// Steps never shrink, even if configured out of order.
    pub fn retry_backoff(&self, attempt: usize) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_glitch_retries() {
            return None;
        }
        let step = self.retry_backoff_ms[..attempt]
            .iter()
            .copied()
            .max()
            .unwrap_or(0);
        Some(Duration::from_millis(step))
    }

    /// Check the policy for values the engine cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if self.device_name.trim().is_empty() {
            return Err("device_name cannot be empty".to_string());
        }
        if self.handshake_poll_interval_ms == 0 {
            return Err("handshake_poll_interval_ms must be positive".to_string());
        }
        if self.cold_start_handshake_deadline_ms < self.handshake_deadline_ms {
            return Err(
                "cold_start_handshake_deadline_ms must not be shorter than handshake_deadline_ms"
                    .to_string(),
            );
        }
        if self.stabilization_window_ms == 0 {
            return Err("stabilization_window_ms must be positive".to_string());
        }
        Ok(())
    }
}
