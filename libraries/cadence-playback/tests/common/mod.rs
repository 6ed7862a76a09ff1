//! Common test utilities: scripted collaborators and a player harness
#![allow(dead_code)]

use async_trait::async_trait;
use cadence_core::{
    AudioContext, ClipRequest, DeviceSdk, DeviceSdkFactory, DeviceState,
    RemoteControl, RemoteDevice, SdkEvent, SdkHandle, TokenGrant, TokenService, TokenSource,
};
use cadence_playback::{ClipPlayer, PlaybackPolicy, PlayerBackend, TokenProvider};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const TRACK: &str = "track:4uLU6hMCjMI75M1A2tKUQC";
pub const OTHER_TRACK: &str = "track:7ouMYWpwJ422jRcDASZB7P";

/// The 10s-25s clip most scenarios use
pub fn clip() -> ClipRequest {
    ClipRequest::new("entry-1", TRACK, 10.0, 25.0)
}

pub fn unpaused(track: &str, position_ms: u64) -> SdkEvent {
    state_event(track, false, position_ms)
}

pub fn paused(track: &str, position_ms: u64) -> SdkEvent {
    state_event(track, true, position_ms)
}

fn state_event(track: &str, paused: bool, position_ms: u64) -> SdkEvent {
    SdkEvent::StateChanged {
        state: Some(DeviceState {
            paused,
            position_ms,
            track_uri: Some(track.to_string()),
        }),
    }
}

pub fn ready(device_id: &str) -> SdkEvent {
    SdkEvent::Ready {
        device_id: device_id.to_string(),
    }
}

/// Poll `condition` on the (usually paused) clock until it holds
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..20_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("timed out waiting until {what}");
}

/// Let spawned tasks run without moving the clock much
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ===== Token service =====

/// Replays scripted credential responses, repeating the last one
pub struct ScriptedTokens {
    responses: Mutex<VecDeque<cadence_core::Result<TokenGrant>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedTokens {
    pub fn new(responses: Vec<cadence_core::Result<TokenGrant>>) -> Arc<Self> {
        Self::delayed(responses, Duration::ZERO)
    }

    pub fn delayed(responses: Vec<cadence_core::Result<TokenGrant>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn premium() -> Arc<Self> {
        Self::new(vec![grant("token-a", 3600, true)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn grant(token: &str, expires_in: u64, premium: bool) -> cadence_core::Result<TokenGrant> {
    Ok(TokenGrant {
        access_token: token.to_string(),
        expires_in,
        premium,
    })
}

#[async_trait]
impl TokenService for ScriptedTokens {
    async fn fetch_credential(&self) -> cadence_core::Result<TokenGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }
}

// ===== Remote control API =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Transfer { device_id: String, play: bool },
    Play { device_id: String, track_uri: String, position_ms: u64 },
    Pause { device_id: String },
}

struct RemoteState {
    device_ids: Vec<String>,
    appear_after: Duration,
    active: bool,
    activate_on_transfer: bool,
    play_results: VecDeque<cadence_core::Result<()>>,
    transfer_results: VecDeque<cadence_core::Result<()>>,
    calls: Vec<(Instant, Call)>,
}

/// Remote control API with a scripted device listing and play results
pub struct FakeRemote {
    origin: Instant,
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    /// Lists `dev-1` and `dev-2` as active from the start; every play succeeds
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            state: Mutex::new(RemoteState {
                device_ids: vec!["dev-1".to_string(), "dev-2".to_string()],
                appear_after: Duration::ZERO,
                active: true,
                activate_on_transfer: true,
                play_results: VecDeque::new(),
                transfer_results: VecDeque::new(),
                calls: Vec::new(),
            }),
        })
    }

    /// Devices appear `after` this remote was created, inactive
    pub fn appearing(after: Duration, activate_on_transfer: bool) -> Arc<Self> {
        let remote = Self::new();
        {
            let mut state = remote.state.lock().unwrap();
            state.appear_after = after;
            state.active = false;
            state.activate_on_transfer = activate_on_transfer;
        }
        remote
    }

    /// Queue results for the next play commands
    pub fn script_plays(&self, results: Vec<cadence_core::Result<()>>) {
        self.state.lock().unwrap().play_results.extend(results);
    }

    /// Queue results for the next transfer commands
    pub fn script_transfers(&self, results: Vec<cadence_core::Result<()>>) {
        self.state.lock().unwrap().transfer_results.extend(results);
    }

    pub fn calls(&self) -> Vec<(Instant, Call)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn plays(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|(_, call)| matches!(call, Call::Play { .. }))
            .map(|(at, _)| at)
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.plays().len()
    }

    pub fn pause_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Pause { .. }))
    }

    pub fn list_count(&self) -> usize {
        self.count(|call| matches!(call, Call::List))
    }

    pub fn transfer_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Transfer { .. }))
    }

    fn count(&self, filter: impl Fn(&Call) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, call)| filter(call))
            .count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push((Instant::now(), call));
    }
}

#[async_trait]
impl RemoteControl for FakeRemote {
    async fn list_devices(&self) -> cadence_core::Result<Vec<RemoteDevice>> {
        self.record(Call::List);
        let state = self.state.lock().unwrap();
        if Instant::now() < self.origin + state.appear_after {
            return Ok(Vec::new());
        }
        Ok(state
            .device_ids
            .iter()
            .map(|id| RemoteDevice {
                id: id.clone(),
                name: "Cadence Journal".to_string(),
                is_active: state.active,
                device_type: "Computer".to_string(),
                volume_percent: None,
            })
            .collect())
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> cadence_core::Result<()> {
        self.record(Call::Transfer {
            device_id: device_id.to_string(),
            play,
        });
        let mut state = self.state.lock().unwrap();
        let result = state.transfer_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() && state.activate_on_transfer {
            state.active = true;
        }
        result
    }

    async fn start_playback(
        &self,
        device_id: &str,
        track_uri: &str,
        position_ms: u64,
    ) -> cadence_core::Result<()> {
        self.record(Call::Play {
            device_id: device_id.to_string(),
            track_uri: track_uri.to_string(),
            position_ms,
        });
        self.state
            .lock()
            .unwrap()
            .play_results
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn pause(&self, device_id: &str) -> cadence_core::Result<()> {
        self.record(Call::Pause {
            device_id: device_id.to_string(),
        });
        Ok(())
    }

    async fn playback_state(&self) -> cadence_core::Result<Option<DeviceState>> {
        Ok(None)
    }
}

// ===== Device SDK =====

#[derive(Default)]
pub struct DeviceStats {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub activations: AtomicUsize,
}

struct FakeDevice {
    stats: Arc<DeviceStats>,
}

impl DeviceSdk for FakeDevice {
    fn connect(&self) -> cadence_core::Result<()> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn activate_element(&self) {
        self.stats.activations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Device factory whose devices emit whatever the test sends
#[derive(Default)]
pub struct FakeDevices {
    senders: Mutex<Vec<mpsc::UnboundedSender<SdkEvent>>>,
    pub stats: Arc<DeviceStats>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    /// Send `event` from the most recently created device
    pub fn emit(&self, event: SdkEvent) {
        let index = self.created().checked_sub(1).expect("no device created");
        self.emit_from(index, event);
    }

    /// Send `event` from device number `index` (0-based creation order)
    pub fn emit_from(&self, index: usize, event: SdkEvent) {
        let senders = self.senders.lock().unwrap();
        // The player may already have dropped the receiver
        let _ = senders[index].send(event);
    }

    pub fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.stats.disconnects.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.stats.activations.load(Ordering::SeqCst)
    }
}

impl DeviceSdkFactory for FakeDevices {
    fn create(&self, _device_name: &str, _tokens: Arc<dyn TokenSource>) -> cadence_core::Result<SdkHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        Ok(SdkHandle {
            sdk: Arc::new(FakeDevice {
                stats: self.stats.clone(),
            }),
            events: rx,
        })
    }
}

// ===== Audio =====

#[derive(Default)]
pub struct CountingAudio {
    pub resumes: AtomicUsize,
    pub primes: AtomicUsize,
}

impl AudioContext for CountingAudio {
    fn resume(&self) -> cadence_core::Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn play_silent_buffer(&self) -> cadence_core::Result<()> {
        self.primes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ===== Harness =====

/// A clip player wired to scripted collaborators
pub struct Harness {
    pub player: ClipPlayer,
    pub remote: Arc<FakeRemote>,
    pub devices: Arc<FakeDevices>,
    pub tokens: Arc<ScriptedTokens>,
    pub provider: Arc<TokenProvider>,
    pub audio: Arc<CountingAudio>,
}

impl Harness {
    pub fn new(policy: PlaybackPolicy) -> Self {
        Self::build(policy, ScriptedTokens::premium(), FakeRemote::new())
    }

    pub fn build(policy: PlaybackPolicy, tokens: Arc<ScriptedTokens>, remote: Arc<FakeRemote>) -> Self {
        let provider = Arc::new(TokenProvider::new(
            tokens.clone(),
            policy.credential_refresh_margin(),
        ));
        let devices = FakeDevices::new();
        let audio = Arc::new(CountingAudio::default());

        let player = ClipPlayer::new(
            policy,
            PlayerBackend {
                tokens: provider.clone(),
                remote: remote.clone(),
                devices: devices.clone(),
                audio: audio.clone(),
            },
        );

        Self {
            player,
            remote,
            devices,
            tokens,
            provider,
            audio,
        }
    }

    /// Request `clip`, bring the device up if needed and wait for the play command
    pub async fn start(&self, clip: ClipRequest) {
        let plays = self.remote.play_count();
        let created = self.devices.created();
        self.player.play_clip(clip).unwrap();

        if self.devices.created() > created {
            let device_id = format!("dev-{}", self.devices.created());
            self.devices.emit(ready(&device_id));
        }
        wait_until("the play command is sent", || self.remote.play_count() > plays).await;
    }

    /// Start `clip` and report it playing until it is stable
    pub async fn start_stable(&self, clip: ClipRequest) {
        let track = clip.track_uri.clone();
        let position = clip.start_ms();
        self.start(clip).await;
        self.devices.emit(unpaused(&track, position));
        wait_until("the clip is stable", || self.player.snapshot().is_playing).await;
    }
}
