//! Gesture-scoped audio unlock
//!
//! Autoplay policies only honor audio started from inside an input event, so
//! everything here is synchronous and must run before `play_clip` returns.

use cadence_core::{AudioContext, DeviceSdk};
use std::sync::Arc;
use tracing::{debug, warn};

/// What one gesture accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnlockOutcome {
    /// The silent buffer was played during this gesture
    pub primed: bool,
    /// The device's playback element was activated
    pub element_activated: bool,
}

/// Resumes the audio context, primes output once per session and activates
/// the device's playback element
pub struct GestureUnlock {
    audio: Arc<dyn AudioContext>,
    primed: bool,
}

impl GestureUnlock {
    pub fn new(audio: Arc<dyn AudioContext>) -> Self {
        Self {
            audio,
            primed: false,
        }
    }

    /// Run the unlock steps for one input gesture
    ///
    /// Failures are logged and swallowed: an unlock that did not take only
    /// costs audible output on platforms that need it.
    pub fn unlock(&mut self, device: Option<&Arc<dyn DeviceSdk>>) -> UnlockOutcome {
        let mut outcome = UnlockOutcome::default();

        if let Err(e) = self.audio.resume() {
            warn!(error = %e, "Audio context resume failed");
        }

        if !self.primed {
            match self.audio.play_silent_buffer() {
                Ok(()) => {
                    self.primed = true;
                    outcome.primed = true;
                    debug!("Audio output primed");
                }
                Err(e) => warn!(error = %e, "Silent buffer failed"),
            }
        }

        if let Some(device) = device {
            device.activate_element();
            outcome.element_activated = true;
        }

        outcome
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Forget priming so the next session primes again
    pub fn reset(&mut self) {
        self.primed = false;
    }
}

/// Audio context for hosts without autoplay restrictions
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudioContext;

impl AudioContext for SilentAudioContext {
    fn resume(&self) -> cadence_core::Result<()> {
        Ok(())
    }

    fn play_silent_buffer(&self) -> cadence_core::Result<()> {
        Ok(())
    }
}
