//! Simulated playback backend
//!
//! A deterministic in-process stand-in for the remote playback service,
//! driven entirely by tokio time so it runs unchanged under a paused clock.
//! It reproduces the quirks the engine has to survive: a device that takes a
//! while to register, a device listing that lags registration, plays that
//! fail with "device not found" and plays that auto-pause right after
//! starting.

use cadence_core::{
    AudioContext, CadenceError, DeviceSdk, DeviceSdkFactory, DeviceState, RemoteControl,
    RemoteDevice, SdkEvent, SdkHandle, TokenGrant, TokenService, TokenSource,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Device quirks to reproduce
#[derive(Debug, Clone)]
pub struct SimulatedQuirks {
    /// Time from `connect` to the `Ready` event
    pub registration_delay: Duration,
    /// Time after `Ready` before the device shows up in listings
    pub listing_lag: Duration,
    /// Leading play commands answered with "device not found"
    pub not_found_plays: usize,
    /// Plays that auto-pause shortly after starting
    pub auto_pause_glitches: usize,
    /// Whether the account is premium
    pub premium: bool,
    /// Lifetime of issued credentials
    pub credential_lifetime: Duration,
    /// Delay between a play command and the first state event
    pub start_latency: Duration,
}

impl Default for SimulatedQuirks {
    fn default() -> Self {
        Self {
            registration_delay: Duration::from_millis(300),
            listing_lag: Duration::ZERO,
            not_found_plays: 0,
            auto_pause_glitches: 0,
            premium: true,
            credential_lifetime: Duration::from_secs(3600),
            start_latency: Duration::from_millis(50),
        }
    }
}

/// Auto-pause delay of a glitching play
const GLITCH_DELAY: Duration = Duration::from_millis(150);

/// Interval of the state events a playing device reports
const REPORT_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone)]
struct Playing {
    track_uri: String,
    position_ms: u64,
    since: Instant,
    paused: bool,
}

impl Playing {
    fn state(&self, now: Instant) -> DeviceState {
        let position_ms = if self.paused {
            self.position_ms
        } else {
            let elapsed = now.saturating_duration_since(self.since).as_millis();
            self.position_ms
                .saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
        };
        DeviceState {
            paused: self.paused,
            position_ms,
            track_uri: Some(self.track_uri.clone()),
        }
    }
}

#[derive(Default)]
struct SimState {
    generation: u64,
    device_name: String,
    events: Option<mpsc::UnboundedSender<SdkEvent>>,
    registered_at: Option<Instant>,
    active: bool,
    playing: Option<Playing>,
    play_serial: u64,
    not_found_left: usize,
    glitches_left: usize,
    premium: bool,
    token_serial: u64,
    plays: usize,
    pauses: usize,
    transfers: usize,
    primes: usize,
    activations: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl SimState {
    fn device_id(&self) -> String {
        format!("sim-device-{}", self.generation)
    }

    fn emit(&self, event: SdkEvent) {
        if let Some(events) = &self.events {
            // A closed channel just means nobody listens anymore
            let _ = events.send(event);
        }
    }

    fn is_listed(&self, now: Instant, listing_lag: Duration) -> bool {
        self.registered_at
            .is_some_and(|at| now >= at + listing_lag)
    }
}

struct SimInner {
    quirks: SimulatedQuirks,
    state: Mutex<SimState>,
}

impl SimInner {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Simulated playback service
///
/// Implements every collaborator the clip player needs. Clones share state.
#[derive(Clone)]
pub struct SimulatedBackend {
    inner: Arc<SimInner>,
}

impl SimulatedBackend {
    pub fn new(quirks: SimulatedQuirks) -> Self {
        let state = SimState {
            not_found_left: quirks.not_found_plays,
            glitches_left: quirks.auto_pause_glitches,
            premium: quirks.premium,
            token_serial: 1,
            ..SimState::default()
        };
        Self {
            inner: Arc::new(SimInner {
                quirks,
                state: Mutex::new(state),
            }),
        }
    }

    /// Play commands received so far
    pub fn plays(&self) -> usize {
        self.inner.lock().plays
    }

    /// Pause commands received so far
    pub fn pauses(&self) -> usize {
        self.inner.lock().pauses
    }

    /// Transfer commands received so far
    pub fn transfers(&self) -> usize {
        self.inner.lock().transfers
    }

    /// Silent buffers played
    pub fn primes(&self) -> usize {
        self.inner.lock().primes
    }

    /// Playback element activations
    pub fn activations(&self) -> usize {
        self.inner.lock().activations
    }

    /// Devices created so far
    pub fn devices_created(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Current player state as the service sees it
    pub fn device_state(&self) -> Option<DeviceState> {
        self.inner
            .lock()
            .playing
            .as_ref()
            .map(|p| p.state(Instant::now()))
    }

    /// Issue a different access token on the next credential exchange
    pub fn rotate_credential(&self) {
        self.inner.lock().token_serial += 1;
    }

    /// Make the device vanish, as when the service drops it
    pub fn drop_device(&self) {
        let mut state = self.inner.lock();
        let device_id = state.device_id();
        state.registered_at = None;
        state.active = false;
        state.playing = None;
        state.emit(SdkEvent::NotReady { device_id });
    }

    fn spawn_tracked(state: &mut SimState, task: impl std::future::Future<Output = ()> + Send + 'static) {
        state.tasks.retain(|t| !t.is_finished());
        state.tasks.push(tokio::spawn(task));
    }

    /// Report the state of play `serial` after `delay`, then keep reporting
    /// while it plays
    fn schedule_reports(&self, state: &mut SimState, serial: u64, delay: Duration) {
        let inner = self.inner.clone();
        Self::spawn_tracked(state, async move {
            tokio::time::sleep(delay).await;
            loop {
                {
                    let state = inner.lock();
                    if state.play_serial != serial {
                        return;
                    }
                    let Some(playing) = state.playing.as_ref() else {
                        return;
                    };
                    let snapshot = playing.state(Instant::now());
                    let paused = snapshot.paused;
                    state.emit(SdkEvent::StateChanged {
                        state: Some(snapshot),
                    });
                    if paused {
                        return;
                    }
                }
                tokio::time::sleep(REPORT_INTERVAL).await;
            }
        });
    }

    fn schedule_glitch(&self, state: &mut SimState, serial: u64, delay: Duration) {
        let inner = self.inner.clone();
        Self::spawn_tracked(state, async move {
            tokio::time::sleep(delay).await;
            let mut state = inner.lock();
            if state.play_serial != serial {
                return;
            }
            let now = Instant::now();
            let Some(playing) = state.playing.as_mut() else {
                return;
            };
            // Pauses without advancing, as the real device does
            playing.paused = true;
            playing.since = now;
            let snapshot = playing.state(now);
            debug!(serial, "Simulated auto-pause");
            state.emit(SdkEvent::StateChanged {
                state: Some(snapshot),
            });
        });
    }
}

/// Device handle returned by [`SimulatedBackend`]
pub struct SimulatedDevice {
    inner: Arc<SimInner>,
    generation: u64,
}

impl DeviceSdkFactory for SimulatedBackend {
    fn create(&self, device_name: &str, _tokens: Arc<dyn TokenSource>) -> cadence_core::Result<SdkHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();
        state.generation += 1;
        state.device_name = device_name.to_string();
        state.events = Some(tx);
        state.registered_at = None;
        state.active = false;
        state.playing = None;

        Ok(SdkHandle {
            sdk: Arc::new(SimulatedDevice {
                inner: self.inner.clone(),
                generation: state.generation,
            }),
            events: rx,
        })
    }
}

impl DeviceSdk for SimulatedDevice {
    fn connect(&self) -> cadence_core::Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CadenceError::device("simulated device needs a Tokio runtime"))?;

        let inner = self.inner.clone();
        let generation = self.generation;
        let delay = self.inner.quirks.registration_delay;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = inner.lock();
            if state.generation != generation || state.events.is_none() {
                return;
            }
            state.registered_at = Some(Instant::now());
            let device_id = state.device_id();
            debug!(device_id = %device_id, "Simulated device registered");
            state.emit(SdkEvent::Ready { device_id });
        });

        self.inner.lock().tasks.push(task);
        Ok(())
    }

    fn disconnect(&self) {
        let mut state = self.inner.lock();
        if state.generation != self.generation {
            return;
        }
        state.events = None;
        state.registered_at = None;
        state.active = false;
        state.playing = None;
        state.play_serial += 1;
        for task in state.tasks.drain(..) {
            task.abort();
        }
    }

    fn activate_element(&self) {
        self.inner.lock().activations += 1;
    }
}

#[async_trait]
impl RemoteControl for SimulatedBackend {
    async fn list_devices(&self) -> cadence_core::Result<Vec<RemoteDevice>> {
        let state = self.inner.lock();
        if !state.is_listed(Instant::now(), self.inner.quirks.listing_lag) {
            return Ok(Vec::new());
        }
        Ok(vec![RemoteDevice {
            id: state.device_id(),
            name: state.device_name.clone(),
            is_active: state.active,
            device_type: "Computer".to_string(),
            volume_percent: Some(100),
        }])
    }

    async fn transfer_playback(&self, device_id: &str, _play: bool) -> cadence_core::Result<()> {
        let mut state = self.inner.lock();
        state.transfers += 1;
        if !state.is_listed(Instant::now(), self.inner.quirks.listing_lag)
            || state.device_id() != device_id
        {
            return Err(CadenceError::DeviceNotFound(device_id.to_string()));
        }
        state.active = true;
        Ok(())
    }

    async fn start_playback(
        &self,
        device_id: &str,
        track_uri: &str,
        position_ms: u64,
    ) -> cadence_core::Result<()> {
        let mut state = self.inner.lock();
        state.plays += 1;

        if !state.premium {
            return Err(CadenceError::PremiumRequired);
        }
        if state.registered_at.is_none() || state.device_id() != device_id {
            return Err(CadenceError::DeviceNotFound(device_id.to_string()));
        }
        if state.not_found_left > 0 {
            state.not_found_left -= 1;
            return Err(CadenceError::DeviceNotFound(device_id.to_string()));
        }

        state.active = true;
        state.play_serial += 1;
        let serial = state.play_serial;
        state.playing = Some(Playing {
            track_uri: track_uri.to_string(),
            position_ms,
            since: Instant::now() + self.inner.quirks.start_latency,
            paused: false,
        });

        let latency = self.inner.quirks.start_latency;
        self.schedule_reports(&mut state, serial, latency);
        if state.glitches_left > 0 {
            state.glitches_left -= 1;
            self.schedule_glitch(&mut state, serial, latency + GLITCH_DELAY);
        }
        Ok(())
    }

    async fn pause(&self, device_id: &str) -> cadence_core::Result<()> {
        let mut state = self.inner.lock();
        state.pauses += 1;
        if state.device_id() != device_id {
            return Err(CadenceError::DeviceNotFound(device_id.to_string()));
        }

        let now = Instant::now();
        state.play_serial += 1;
        let snapshot = state.playing.as_mut().map(|playing| {
            let current = playing.state(now);
            playing.position_ms = current.position_ms;
            playing.since = now;
            playing.paused = true;
            playing.state(now)
        });
        if let Some(snapshot) = snapshot {
            state.emit(SdkEvent::StateChanged {
                state: Some(snapshot),
            });
        }
        Ok(())
    }

    async fn playback_state(&self) -> cadence_core::Result<Option<DeviceState>> {
        Ok(self.device_state())
    }
}

#[async_trait]
impl TokenService for SimulatedBackend {
    async fn fetch_credential(&self) -> cadence_core::Result<TokenGrant> {
        let state = self.inner.lock();
        Ok(TokenGrant {
            access_token: format!("sim-token-{}", state.token_serial),
            expires_in: self.inner.quirks.credential_lifetime.as_secs(),
            premium: state.premium,
        })
    }
}

impl AudioContext for SimulatedBackend {
    fn resume(&self) -> cadence_core::Result<()> {
        Ok(())
    }

    fn play_silent_buffer(&self) -> cadence_core::Result<()> {
        self.inner.lock().primes += 1;
        Ok(())
    }
}
