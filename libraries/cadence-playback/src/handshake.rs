//! Activation handshake
//!
//! Device registration can lag device creation, so before a play command the
//! remote control API is polled until it lists the device as the active
//! target. The handshake never gates playback: on timeout the caller proceeds
//! anyway, since some devices only register fully on their first play.

use cadence_core::{CadenceError, RemoteControl};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of one handshake run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandshakeOutcome {
    /// The device was listed by the last successful poll
    pub present: bool,
    /// The device was listed as the active target
    pub active: bool,
    /// The deadline passed before the device became active
    pub timed_out: bool,
    /// Skipped thanks to a recent confirmation
    pub cached: bool,
}

impl HandshakeOutcome {
    fn cached() -> Self {
        Self {
            present: true,
            active: true,
            timed_out: false,
            cached: true,
        }
    }
}

/// Short-lived memory of the last confirmed activation
#[derive(Debug, Default)]
pub struct ActivationCache {
    confirmed: Option<(String, Instant)>,
}

impl ActivationCache {
    /// Whether `device_id` was confirmed active less than `ttl` ago
    pub fn is_fresh(&self, device_id: &str, ttl: Duration, now: Instant) -> bool {
        self.confirmed
            .as_ref()
            .is_some_and(|(id, at)| id == device_id && now.saturating_duration_since(*at) < ttl)
    }

    pub fn record(&mut self, device_id: &str, now: Instant) {
        self.confirmed = Some((device_id.to_string(), now));
    }

    pub fn clear(&mut self) {
        self.confirmed = None;
    }
}

/// Polls the remote control API until a device is the active target
pub struct ActivationHandshake<'a> {
    remote: &'a dyn RemoteControl,
    poll_interval: Duration,
    deadline: Duration,
}

impl<'a> ActivationHandshake<'a> {
    pub fn new(remote: &'a dyn RemoteControl, poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            remote,
            poll_interval,
            deadline,
        }
    }

    /// Skip the handshake when `cache` holds a fresh confirmation for `device_id`
    pub fn check_cache(
        cache: &ActivationCache,
        device_id: &str,
        ttl: Duration,
    ) -> Option<HandshakeOutcome> {
        cache
            .is_fresh(device_id, ttl, Instant::now())
            .then(HandshakeOutcome::cached)
    }

    /// Poll until `device_id` is active or the deadline passes
    ///
    /// On the first poll that finds the device present but inactive, one
    /// transfer (without autoplay) is issued; a "device not found" answer to
    /// that transfer earns it one more attempt. Returns `None` as soon as
    /// `is_current` reports the command was superseded.
    pub async fn run(
        &self,
        device_id: &str,
        is_current: impl Fn() -> bool,
    ) -> Option<HandshakeOutcome> {
        let started = Instant::now();
        let give_up = started + self.deadline;
        let mut outcome = HandshakeOutcome::default();
        let mut transfers_left = 1u8;
        let mut not_found_retry = true;
        let mut polls = 0u32;

        loop {
            if !is_current() {
                debug!(device_id = %device_id, "Handshake abandoned; command superseded");
                return None;
            }

            polls += 1;
            match self.remote.list_devices().await {
                Ok(devices) => {
                    let listed = devices.iter().find(|d| d.id == device_id);
                    outcome.present = listed.is_some();
                    outcome.active = listed.is_some_and(|d| d.is_active);

                    if outcome.active {
                        info!(
                            device_id = %device_id,
                            polls,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Device confirmed active"
                        );
                        return Some(outcome);
                    }

                    if outcome.present && transfers_left > 0 {
                        transfers_left -= 1;
                        match self.remote.transfer_playback(device_id, false).await {
                            Ok(()) => debug!(device_id = %device_id, "Transferred playback to device"),
                            Err(CadenceError::DeviceNotFound(_)) if not_found_retry => {
                                not_found_retry = false;
                                transfers_left += 1;
                                debug!(device_id = %device_id, "Transfer found no device; will retry once");
                            }
                            Err(e) => warn!(device_id = %device_id, error = %e, "Transfer failed"),
                        }
                    } else {
                        debug!(device_id = %device_id, present = outcome.present, "Device not active yet");
                    }
                }
                Err(e) => warn!(device_id = %device_id, error = %e, "Device listing failed"),
            }

            let next_poll = started + self.poll_interval * polls;
            if next_poll > give_up {
                break;
            }
            tokio::time::sleep_until(next_poll).await;
        }

        outcome.timed_out = true;
        info!(
            device_id = %device_id,
            present = outcome.present,
            "Handshake deadline passed; proceeding to play"
        );
        Some(outcome)
    }
}
