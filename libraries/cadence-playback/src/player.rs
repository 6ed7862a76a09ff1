//! Clip playback orchestrator
//!
//! [`ClipPlayer`] owns the single context of the subsystem: device session,
//! stabilization tracker, clip timers, activation cache and observable state.
//! Every command runs its synchronous part under the context lock and hands
//! the rest to detached tasks. Each task carries the [`CommandId`] it was
//! started for and re-checks it before touching shared state, so a newer
//! command makes older continuations inert without cancelling them.
//!
//! The context lock is never held across an await point.

use crate::config::{Platform, PlaybackPolicy};
use crate::error::{PlaybackError, Result, TokenError};
use crate::handshake::{ActivationCache, ActivationHandshake};
use crate::listener::{StabilityTracker, Verdict};
use crate::session::DeviceSession;
use crate::state::{PauseReason, PlayerSnapshot};
use crate::timers::ClipTimers;
use crate::token::TokenProvider;
use crate::unlock::GestureUnlock;
use cadence_core::{
    AudioContext, CadenceError, ClipRequest, CommandId, ConnectionState, DeviceSdkFactory,
    RemoteControl, SdkEvent, TokenSource,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// External collaborators of the player
pub struct PlayerBackend {
    /// Credential owner; also handed to devices as their token source
    pub tokens: Arc<TokenProvider>,
    /// Remote control API
    pub remote: Arc<dyn RemoteControl>,
    /// Creates playback devices
    pub devices: Arc<dyn DeviceSdkFactory>,
    /// Platform audio context for gesture unlock
    pub audio: Arc<dyn AudioContext>,
}

/// Remote clip player
///
/// All methods are synchronous and return immediately; they must be called
/// from within a Tokio runtime because they spawn background work.
pub struct ClipPlayer {
    shared: Arc<Shared>,
}

struct Shared {
    policy: PlaybackPolicy,
    tokens: Arc<TokenProvider>,
    remote: Arc<dyn RemoteControl>,
    devices: Arc<dyn DeviceSdkFactory>,
    state_tx: watch::Sender<PlayerSnapshot>,
    ctx: Mutex<Context>,
}

#[derive(Debug, Clone)]
struct ActiveClip {
    command: CommandId,
    clip: ClipRequest,
}

struct Context {
    session: DeviceSession,
    unlock: GestureUnlock,
    tracker: StabilityTracker,
    timers: ClipTimers,
    stability_timer: Option<JoinHandle<()>>,
    activation: ActivationCache,
    active: Option<ActiveClip>,
    last_command: CommandId,
    cold_start_until: Option<Instant>,
    snapshot: PlayerSnapshot,
}

impl Context {
    fn is_current(&self, command: CommandId) -> bool {
        self.active.as_ref().is_some_and(|a| a.command == command)
    }

    fn in_cold_start(&self) -> bool {
        self.cold_start_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Clear the timer pair and everything stabilization left running
    fn clear_clip_tasks(&mut self) {
        self.timers.clear();
        if let Some(timer) = self.stability_timer.take() {
            timer.abort();
        }
        self.tracker.reset();
    }

    /// The device is gone: back to idle, nothing queued
    fn device_lost(&mut self) {
        self.session.mark_not_ready();
        self.clear_clip_tasks();
        self.activation.clear();
        self.active = None;
        self.snapshot.to_idle();
        self.snapshot.is_ready = false;
        self.snapshot.device_id = None;
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Context> {
        self.ctx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, ctx: &Context) {
        self.state_tx.send_if_modified(|current| {
            if *current == ctx.snapshot {
                false
            } else {
                *current = ctx.snapshot.clone();
                true
            }
        });
    }
}

impl ClipPlayer {
    pub fn new(policy: PlaybackPolicy, backend: PlayerBackend) -> Self {
        let snapshot = PlayerSnapshot::default();
        let (state_tx, _) = watch::channel(snapshot.clone());

        let ctx = Context {
            session: DeviceSession::new(),
            unlock: GestureUnlock::new(backend.audio),
            tracker: StabilityTracker::new(),
            timers: ClipTimers::new(),
            stability_timer: None,
            activation: ActivationCache::default(),
            active: None,
            last_command: CommandId::new(0),
            cold_start_until: None,
            snapshot,
        };

        Self {
            shared: Arc::new(Shared {
                policy,
                tokens: backend.tokens,
                remote: backend.remote,
                devices: backend.devices,
                state_tx,
                ctx: Mutex::new(ctx),
            }),
        }
    }

    pub fn policy(&self) -> &PlaybackPolicy {
        &self.shared.policy
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.shared.tokens
    }

    /// Watch every change of the observable state
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.shared.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.shared.lock().snapshot.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lock().session.state()
    }

    /// Whether a clip timer pair is scheduled
    pub fn timers_live(&self) -> bool {
        self.shared.lock().timers.is_live()
    }

    /// Command of the clip currently requested, if any
    pub fn current_command(&self) -> Option<CommandId> {
        self.shared.lock().active.as_ref().map(|a| a.command)
    }

    /// Request playback of a clip
    ///
    /// Returns as soon as the gesture-bound work is done: audio unlocked,
    /// device created if needed, the request made current and the previous
    /// clip's timers cleared. Everything that waits happens in the background.
    ///
    /// # Errors
    /// `InvalidClip`, `NeedsReauth` or `PremiumRequired`; every other failure
    /// surfaces only through the observable state.
    pub fn play_clip(&self, request: ClipRequest) -> Result<CommandId> {
        request
            .validate()
            .map_err(|e| PlaybackError::InvalidClip(e.to_string()))?;

        let shared = &self.shared;
        let mut ctx = shared.lock();

        if shared.tokens.needs_reauth() {
            ctx.snapshot.needs_reauth = true;
            shared.publish(&ctx);
            return Err(PlaybackError::NeedsReauth);
        }
        if !ctx.snapshot.is_premium {
            return Err(PlaybackError::PremiumRequired);
        }

        let device = ctx.session.sdk().cloned();
        ctx.unlock.unlock(device.as_ref());

        ctx.clear_clip_tasks();
        ctx.session.cancel_pending();
        let command = ctx.last_command.next();
        ctx.last_command = command;
        ctx.active = Some(ActiveClip {
            command,
            clip: request.clone(),
        });

        ctx.snapshot.position_ms = request.start_ms();
        ctx.snapshot.is_playing = false;
        ctx.snapshot.is_initializing = true;
        info!(
            command = %command,
            entry_id = %request.entry_id,
            track = %request.track_uri,
            start_ms = request.start_ms(),
            end_ms = request.end_ms(),
            "Clip requested"
        );
        ctx.snapshot.current_clip = Some(request);

        if ctx.session.state().needs_creation() {
            // Created inside the gesture so the device is gesture-attributed
            if let Err(e) = open_session(shared, &mut ctx) {
                warn!(command = %command, error = %e, "Could not create playback device");
                ctx.snapshot.is_initializing = false;
                shared.publish(&ctx);
                return Ok(command);
            }
            if let Some(device) = ctx.session.sdk() {
                device.activate_element();
            }
        }

        if !ctx.session.is_ready() {
            match shared.policy.platform {
                Platform::Desktop => ctx.session.queue(command),
                Platform::Mobile => {
                    debug!(command = %command, "Device not ready; this gesture only primes playback");
                }
            }
            shared.publish(&ctx);
            return Ok(command);
        }

        shared.publish(&ctx);
        drop(ctx);
        tokio::spawn(dispatch(shared.clone(), command));
        Ok(command)
    }

    /// Stop the current clip
    pub fn pause_clip(&self, reason: PauseReason) {
        let shared = &self.shared;
        let device_id = {
            let mut ctx = shared.lock();
            let had_clip = ctx.active.take().is_some();
            ctx.clear_clip_tasks();
            ctx.session.cancel_pending();
            ctx.snapshot.to_idle();
            shared.publish(&ctx);
            if had_clip {
                ctx.session.device_id().map(str::to_owned)
            } else {
                None
            }
        };

        info!(reason = %reason, "Clip paused");
        spawn_remote_pause(shared, device_id);
    }

    /// Hard reset: detach listeners, disconnect the device, forget credentials
    ///
    /// Safe to call any number of times.
    pub fn cleanup(&self) {
        let shared = &self.shared;
        let mut ctx = shared.lock();

        ctx.session.teardown();
        ctx.clear_clip_tasks();
        ctx.activation.clear();
        ctx.active = None;
        ctx.unlock.reset();
        ctx.cold_start_until = None;
        ctx.snapshot = PlayerSnapshot::default();
        shared.tokens.clear();

        shared.publish(&ctx);
        info!("Clip player cleaned up");
    }

    /// Create the device ahead of the first clip request
    ///
    /// # Errors
    /// `NeedsReauth` when the account must be re-linked first,
    /// `DeviceUnavailable` when the device could not be created.
    pub fn warm_up(&self) -> Result<()> {
        let shared = &self.shared;
        if shared.tokens.needs_reauth() {
            return Err(PlaybackError::NeedsReauth);
        }

        let mut ctx = shared.lock();
        if !ctx.session.state().needs_creation() {
            return Ok(());
        }

        debug!("Warming up playback device");
        let opened = open_session(shared, &mut ctx);
        shared.publish(&ctx);
        opened.map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))
    }

    /// A sign-in just happened; device registration may lag for a while
    pub fn notify_signed_in(&self) {
        let shared = &self.shared;
        shared.tokens.clear();

        let mut ctx = shared.lock();
        ctx.cold_start_until = Some(Instant::now() + shared.policy.cold_start_window());
        ctx.snapshot.needs_reauth = false;
        ctx.snapshot.is_premium = true;
        shared.publish(&ctx);
        debug!(
            window_ms = shared.policy.cold_start_window_ms,
            "Cold-start window opened"
        );
    }
}

impl Drop for ClipPlayer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Create and connect a device, and start pumping its events
fn open_session(shared: &Arc<Shared>, ctx: &mut Context) -> cadence_core::Result<()> {
    let tokens: Arc<dyn TokenSource> = shared.tokens.clone();
    ctx.activation.clear();
    ctx.snapshot.is_ready = false;
    ctx.snapshot.device_id = None;

    let events = ctx.session.open(
        shared.devices.as_ref(),
        &shared.policy.device_name,
        tokens,
        shared.tokens.epoch(),
    )?;

    let pump = tokio::spawn(pump_events(
        Arc::downgrade(shared),
        ctx.session.generation(),
        events,
    ));
    ctx.session.attach_listener(pump);
    Ok(())
}

async fn pump_events(
    shared: Weak<Shared>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<SdkEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        handle_event(&shared, generation, event);
    }
    debug!(generation, "Device event stream closed");
}

fn handle_event(shared: &Arc<Shared>, generation: u64, event: SdkEvent) {
    let mut ctx = shared.lock();
    if ctx.session.generation() != generation {
        debug!(generation, event = event.name(), "Dropping event from a detached device");
        return;
    }

    match event {
        SdkEvent::Ready { device_id } => {
            ctx.snapshot.is_ready = true;
            ctx.snapshot.device_id = Some(device_id.clone());
            let pending = ctx.session.mark_ready(device_id);
            let queued = pending.filter(|c| ctx.is_current(*c));

            if let Some(command) = queued {
                shared.publish(&ctx);
                drop(ctx);
                tokio::spawn(dispatch(shared.clone(), command));
                return;
            }
            ctx.snapshot.is_initializing = false;
        }
        SdkEvent::NotReady { device_id } => {
            info!(device_id = %device_id, "Device went offline");
            ctx.device_lost();
        }
        SdkEvent::InitializationError { message } => {
            warn!(message = %message, "Device initialization failed");
            ctx.device_lost();
        }
        SdkEvent::AuthenticationError { message } => {
            warn!(message = %message, "Device rejected the credential");
            shared.tokens.invalidate();
            ctx.device_lost();
        }
        SdkEvent::AccountError { message } => {
            warn!(message = %message, "Account cannot use remote playback");
            ctx.snapshot.is_premium = false;
            ctx.device_lost();
        }
        SdkEvent::PlaybackError { message } => {
            warn!(message = %message, "Device playback error");
            ctx.device_lost();
        }
        SdkEvent::StateChanged { state } => {
            let tracked = ctx.tracker.command();
            let verdict = ctx
                .tracker
                .observe(state.as_ref(), Instant::now(), &shared.policy);
            apply_verdict(shared, &mut ctx, tracked, verdict);
        }
    }

    shared.publish(&ctx);
}

fn apply_verdict(
    shared: &Arc<Shared>,
    ctx: &mut Context,
    tracked: Option<CommandId>,
    verdict: Verdict,
) {
    let Some(command) = tracked else {
        if verdict == Verdict::Cleared {
            ctx.snapshot.is_playing = false;
            ctx.snapshot.is_initializing = false;
        }
        return;
    };

    match verdict {
        Verdict::Ignored | Verdict::Noop => {}
        Verdict::WindowOpened => {
            debug!(command = %command, "Device started; stabilizing");
            schedule_stability_check(shared, ctx, command);
        }
        Verdict::Stable => on_stable(shared, ctx, command),
        Verdict::Glitch { attempt, backoff } => {
            info!(
                command = %command,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Transient auto-pause; re-issuing play"
            );
            if let Some(timer) = ctx.stability_timer.take() {
                timer.abort();
            }
            schedule_retry(shared, command, backoff);
        }
        Verdict::GlitchesExhausted => {
            warn!(command = %command, "Device kept pausing; giving up on this clip");
            ctx.clear_clip_tasks();
            ctx.snapshot.is_playing = false;
            ctx.snapshot.is_initializing = false;
        }
        Verdict::Stopped => {
            info!(command = %command, "Playback stopped on the device");
            ctx.clear_clip_tasks();
            ctx.snapshot.is_playing = false;
            ctx.snapshot.is_initializing = false;
        }
        Verdict::Cleared => {
            if ctx.tracker.command().is_none() {
                ctx.clear_clip_tasks();
            }
            ctx.snapshot.is_playing = false;
            ctx.snapshot.is_initializing = false;
        }
    }
}

fn schedule_stability_check(shared: &Arc<Shared>, ctx: &mut Context, command: CommandId) {
    let window = shared.policy.stabilization_window();
    let task_shared = shared.clone();

    let timer = tokio::spawn(async move {
        tokio::time::sleep(window).await;
        let mut ctx = task_shared.lock();
        let verdict = ctx
            .tracker
            .window_elapsed(command, Instant::now(), &task_shared.policy);
        if verdict == Verdict::Stable {
            on_stable(&task_shared, &mut ctx, command);
            task_shared.publish(&ctx);
        }
    });

    if let Some(previous) = ctx.stability_timer.replace(timer) {
        previous.abort();
    }
}

/// Genuine playback confirmed: anchor the clip timers to this instant
fn on_stable(shared: &Arc<Shared>, ctx: &mut Context, command: CommandId) {
    let Some(clip) = ctx
        .active
        .as_ref()
        .filter(|a| a.command == command)
        .map(|a| a.clip.clone())
    else {
        return;
    };

    let stable_start = Instant::now();
    let start_ms = clip.start_ms();
    let end_ms = clip.end_ms();
    let tick = shared.policy.progress_tick();

    let progress_shared = shared.clone();
    let progress = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(stable_start + tick, tick);
        loop {
            ticker.tick().await;
            let mut ctx = progress_shared.lock();
            if !ctx.is_current(command) {
                break;
            }
            let elapsed = u64::try_from(stable_start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let position = start_ms.saturating_add(elapsed).min(end_ms);
            if position > ctx.snapshot.position_ms {
                ctx.snapshot.position_ms = position;
                progress_shared.publish(&ctx);
            }
        }
    });

    let end_shared = shared.clone();
    let clip_end_at = stable_start + Duration::from_millis(clip.duration_ms());
    let clip_end = tokio::spawn(async move {
        tokio::time::sleep_until(clip_end_at).await;
        finish_clip(&end_shared, command);
    });

    ctx.timers.install(command, progress, clip_end);
    if let Some(device_id) = ctx.session.device_id().map(str::to_owned) {
        ctx.activation.record(&device_id, stable_start);
    }

    ctx.snapshot.is_playing = true;
    ctx.snapshot.is_initializing = false;
    ctx.snapshot.position_ms = start_ms;
    info!(
        command = %command,
        track = %clip.track_uri,
        duration_ms = clip.duration_ms(),
        "Clip stabilized; playing"
    );
}

/// Clip-end timeout fired
fn finish_clip(shared: &Arc<Shared>, command: CommandId) {
    let device_id = {
        let mut ctx = shared.lock();
        let active = match ctx.active.take() {
            Some(active) if active.command == command => active,
            other => {
                ctx.active = other;
                return;
            }
        };

        // Aborts this very task too; nothing below awaits
        ctx.clear_clip_tasks();
        ctx.snapshot.position_ms = active.clip.end_ms();
        ctx.snapshot.to_idle();
        shared.publish(&ctx);
        ctx.session.device_id().map(str::to_owned)
    };

    info!(command = %command, reason = %PauseReason::ClipEnded, "Clip finished");
    spawn_remote_pause(shared, device_id);
}

fn spawn_remote_pause(shared: &Arc<Shared>, device_id: Option<String>) {
    let Some(device_id) = device_id else {
        return;
    };
    let shared = shared.clone();

    tokio::spawn(async move {
        match shared.remote.pause(&device_id).await {
            Ok(()) => debug!(device_id = %device_id, "Device paused"),
            Err(e) if e.is_credential_failure() => {
                warn!(device_id = %device_id, error = %e, "Pause rejected; credential dropped");
                shared.tokens.invalidate();
            }
            Err(e) => warn!(device_id = %device_id, error = %e, "Pause failed"),
        }
    });
}

fn schedule_retry(shared: &Arc<Shared>, command: CommandId, backoff: Duration) {
    let shared = shared.clone();
    tokio::spawn(async move {
        tokio::time::sleep(backoff).await;
        let device_id = {
            let ctx = shared.lock();
            if !ctx.is_current(command) {
                return;
            }
            ctx.session.device_id().map(str::to_owned)
        };
        if let Some(device_id) = device_id {
            issue_play(&shared, command, &device_id, false).await;
        }
    });
}

/// Background half of `play_clip`: credential, device, handshake, play
async fn dispatch(shared: Arc<Shared>, command: CommandId) {
    let credential = match shared.tokens.access_credential().await {
        Ok(credential) => credential,
        Err(TokenError::NeedsReauth) => {
            halt_for_reauth(&shared, command);
            return;
        }
        Err(TokenError::Unavailable(e)) => {
            warn!(command = %command, error = %e, "No credential; clip not started");
            settle(&shared, command);
            return;
        }
    };

    let (device_id, cached, deadline) = {
        let mut ctx = shared.lock();
        if !ctx.is_current(command) {
            debug!(command = %command, "Superseded before dispatch");
            return;
        }

        ctx.snapshot.is_premium = credential.is_premium;
        if !credential.is_premium {
            warn!(command = %command, "Account cannot use remote playback");
            ctx.active = None;
            ctx.snapshot.to_idle();
            shared.publish(&ctx);
            return;
        }

        if ctx.session.sdk().is_some() && ctx.session.credential_epoch() != shared.tokens.epoch() {
            info!(command = %command, "Credential rotated; recreating device");
            reopen_and_queue(&shared, &mut ctx, command);
            shared.publish(&ctx);
            return;
        }

        let device_id = match ctx.session.device_id() {
            Some(id) if ctx.session.is_ready() => id.to_owned(),
            _ => {
                if ctx.session.state() == ConnectionState::Connecting {
                    ctx.session.queue(command);
                } else if shared.policy.platform == Platform::Desktop {
                    reopen_and_queue(&shared, &mut ctx, command);
                } else {
                    ctx.snapshot.is_initializing = false;
                }
                shared.publish(&ctx);
                return;
            }
        };

        let cached = ActivationHandshake::check_cache(
            &ctx.activation,
            &device_id,
            shared.policy.activation_cache_ttl(),
        );
        let deadline = shared.policy.handshake_deadline(ctx.in_cold_start());
        (device_id, cached, deadline)
    };

    let outcome = match cached {
        Some(outcome) => outcome,
        None => {
            let handshake = ActivationHandshake::new(
                shared.remote.as_ref(),
                shared.policy.handshake_poll_interval(),
                deadline,
            );
            let is_current = || shared.lock().is_current(command);
            match handshake.run(&device_id, is_current).await {
                Some(outcome) => outcome,
                None => return,
            }
        }
    };

    if outcome.active && !outcome.cached {
        shared.lock().activation.record(&device_id, Instant::now());
    }
    debug!(
        command = %command,
        present = outcome.present,
        active = outcome.active,
        timed_out = outcome.timed_out,
        cached = outcome.cached,
        "Handshake finished"
    );

    issue_play(&shared, command, &device_id, true).await;
}

fn reopen_and_queue(shared: &Arc<Shared>, ctx: &mut Context, command: CommandId) {
    match open_session(shared, ctx) {
        Ok(()) => ctx.session.queue(command),
        Err(e) => {
            warn!(command = %command, error = %e, "Could not recreate playback device");
            ctx.snapshot.is_initializing = false;
        }
    }
}

/// Send the play command, retrying once if the device is not registered yet
///
/// `arm` starts stabilization tracking; glitch retries keep the existing
/// tracking so their retry count carries over.
async fn issue_play(shared: &Arc<Shared>, command: CommandId, device_id: &str, arm: bool) {
    let (track_uri, position_ms, mut not_found_retry) = {
        let mut ctx = shared.lock();
        let Some((track_uri, position_ms)) = ctx
            .active
            .as_ref()
            .filter(|a| a.command == command)
            .map(|a| (a.clip.track_uri.clone(), a.clip.start_ms()))
        else {
            return;
        };

        if shared.tokens.needs_reauth() {
            drop(ctx);
            halt_for_reauth(shared, command);
            return;
        }
        if arm {
            ctx.tracker.arm(command, &track_uri, position_ms);
        }
        let first_play = ctx.session.take_first_play();
        (track_uri, position_ms, first_play)
    };

    loop {
        match shared
            .remote
            .start_playback(device_id, &track_uri, position_ms)
            .await
        {
            Ok(()) => {
                debug!(
                    command = %command,
                    device_id = %device_id,
                    position_ms,
                    "Play accepted; awaiting stabilization"
                );
                return;
            }
            Err(CadenceError::DeviceNotFound(_)) if not_found_retry => {
                not_found_retry = false;
                debug!(command = %command, device_id = %device_id, "Device not registered yet; retrying play once");
                tokio::time::sleep(shared.policy.not_found_retry_delay()).await;
                if !shared.lock().is_current(command) {
                    return;
                }
            }
            Err(e) => {
                play_failed(shared, command, &e);
                return;
            }
        }
    }
}

fn play_failed(shared: &Arc<Shared>, command: CommandId, error: &CadenceError) {
    let mut ctx = shared.lock();
    if !ctx.is_current(command) {
        return;
    }

    match error {
        CadenceError::Unauthorized(_) | CadenceError::ReauthRequired => {
            warn!(command = %command, error = %error, "Play rejected; credential dropped");
            shared.tokens.invalidate();
        }
        CadenceError::PremiumRequired => {
            warn!(command = %command, "Play rejected; account is not premium");
            ctx.snapshot.is_premium = false;
        }
        _ => warn!(command = %command, error = %error, "Play command failed"),
    }

    ctx.tracker.reset();
    ctx.snapshot.is_playing = false;
    ctx.snapshot.is_initializing = false;
    shared.publish(&ctx);
}

fn halt_for_reauth(shared: &Arc<Shared>, command: CommandId) {
    let mut ctx = shared.lock();
    ctx.snapshot.needs_reauth = true;
    if ctx.is_current(command) {
        ctx.clear_clip_tasks();
        ctx.active = None;
        ctx.snapshot.to_idle();
    }
    shared.publish(&ctx);
    info!(command = %command, "Playback halted until the account is re-linked");
}

/// A command failed quietly; leave the request visible but idle
fn settle(shared: &Arc<Shared>, command: CommandId) {
    let mut ctx = shared.lock();
    if ctx.is_current(command) {
        ctx.tracker.reset();
        ctx.snapshot.is_playing = false;
        ctx.snapshot.is_initializing = false;
        shared.publish(&ctx);
    }
}
