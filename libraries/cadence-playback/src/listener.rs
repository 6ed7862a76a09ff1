//! Playback state listener - stabilization protocol
//!
//! Device state events are read-only observations. The tracker classifies
//! them against the armed command and returns a [`Verdict`]; acting on the
//! verdict (timers, retries, state) is the orchestrator's job.
//!
//! A play command's success response proves nothing: the device may start
//! and immediately auto-pause. A start only counts once it is *stable*:
//! unpaused for the whole stabilization window, or with the position
//! advanced by the minimum delta, whichever comes first.

use crate::config::PlaybackPolicy;
use cadence_core::{CommandId, DeviceState};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Classification of one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not for the armed command (wrong track, nothing armed, pre-start pause)
    Ignored,
    /// First unpaused event; the stabilization window is now open
    WindowOpened,
    /// Genuine sustained playback
    Stable,
    /// Transient auto-pause; re-issue the same command after `backoff`
    Glitch { attempt: usize, backoff: Duration },
    /// Auto-pauses kept coming; give up quietly
    GlitchesExhausted,
    /// Legitimate stop
    Stopped,
    /// The device reports no player state at all
    Cleared,
    /// Nothing changed
    Noop,
}

/// The first unpaused observation of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityWindow {
    pub command: CommandId,
    pub first_unpaused_at: Instant,
    pub first_unpaused_position_ms: u64,
}

#[derive(Debug)]
struct Armed {
    command: CommandId,
    track_uri: String,
    start_position_ms: u64,
    window: Option<StabilityWindow>,
    stable: bool,
    glitch_retries: usize,
}

/// Stabilization state machine for the command currently awaiting playback
#[derive(Debug, Default)]
pub struct StabilityTracker {
    armed: Option<Armed>,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `command`, discarding whatever was tracked before
    ///
    /// `start_position_ms` is where the command seeks to; the window only
    /// opens on a report near it.
    pub fn arm(&mut self, command: CommandId, track_uri: &str, start_position_ms: u64) {
        self.armed = Some(Armed {
            command,
            track_uri: track_uri.to_string(),
            start_position_ms,
            window: None,
            stable: false,
            glitch_retries: 0,
        });
    }

    /// Stop tracking; every later observation is ignored until re-armed
    pub fn reset(&mut self) {
        self.armed = None;
    }

    pub fn command(&self) -> Option<CommandId> {
        self.armed.as_ref().map(|a| a.command)
    }

    pub fn is_stable(&self) -> bool {
        self.armed.as_ref().is_some_and(|a| a.stable)
    }

    pub fn window(&self) -> Option<StabilityWindow> {
        self.armed.as_ref().and_then(|a| a.window)
    }

    pub fn glitch_retries(&self) -> usize {
        self.armed.as_ref().map_or(0, |a| a.glitch_retries)
    }

    /// Classify a device state event observed at `now`
    pub fn observe(
        &mut self,
        state: Option<&DeviceState>,
        now: Instant,
        policy: &PlaybackPolicy,
    ) -> Verdict {
        let Some(state) = state else {
            if let Some(armed) = self.armed.as_mut() {
                if armed.stable {
                    self.armed = None;
                }
            }
            return Verdict::Cleared;
        };

        let Some(armed) = self.armed.as_mut() else {
            return Verdict::Ignored;
        };

        if !state.is_track(&armed.track_uri) {
            debug!(
                command = %armed.command,
                track = ?state.track_uri,
                "Dropping state for another track"
            );
            return Verdict::Ignored;
        }

        if !state.paused {
            if armed.stable {
                return Verdict::Noop;
            }
            return match armed.window {
                None => {
                    let offset = state.position_ms.abs_diff(armed.start_position_ms);
                    if offset > policy.start_position_tolerance_ms {
                        // Still reporting an earlier play of the same track
                        debug!(
                            command = %armed.command,
                            position_ms = state.position_ms,
                            start_ms = armed.start_position_ms,
                            "Dropping state far from the clip start"
                        );
                        return Verdict::Ignored;
                    }
                    armed.window = Some(StabilityWindow {
                        command: armed.command,
                        first_unpaused_at: now,
                        first_unpaused_position_ms: state.position_ms,
                    });
                    Verdict::WindowOpened
                }
                Some(window) => {
                    let advanced = state
                        .position_ms
                        .saturating_sub(window.first_unpaused_position_ms);
                    if advanced >= policy.min_position_advance_ms {
                        armed.stable = true;
                        Verdict::Stable
                    } else {
                        Verdict::Noop
                    }
                }
            };
        }

        if armed.stable {
            self.armed = None;
            return Verdict::Stopped;
        }

        let Some(window) = armed.window else {
            // Paused before anything started: the device has not caught up yet
            return Verdict::Ignored;
        };

        let since_start = now.saturating_duration_since(window.first_unpaused_at);
        let drift = state.position_ms.abs_diff(window.first_unpaused_position_ms);
        let is_glitch = since_start <= policy.glitch_window()
            && drift <= policy.glitch_position_tolerance_ms;

        if !is_glitch {
            self.armed = None;
            return Verdict::Stopped;
        }

        armed.glitch_retries += 1;
        armed.window = None;
        match policy.retry_backoff(armed.glitch_retries) {
            Some(backoff) => Verdict::Glitch {
                attempt: armed.glitch_retries,
                backoff,
            },
            None => {
                self.armed = None;
                Verdict::GlitchesExhausted
            }
        }
    }

    /// The stabilization timer for `command` fired at `now`
    ///
    /// Declares stability when the window opened at least a full
    /// stabilization period ago and no pause interrupted it.
    pub fn window_elapsed(
        &mut self,
        command: CommandId,
        now: Instant,
        policy: &PlaybackPolicy,
    ) -> Verdict {
        let Some(armed) = self.armed.as_mut() else {
            return Verdict::Ignored;
        };
        if armed.command != command || armed.stable {
            return Verdict::Ignored;
        }
        match armed.window {
            Some(window)
                if now.saturating_duration_since(window.first_unpaused_at)
                    >= policy.stabilization_window() =>
            {
                armed.stable = true;
                Verdict::Stable
            }
            _ => Verdict::Noop,
        }
    }
}
