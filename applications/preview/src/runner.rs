//! Building a clip player and driving one clip to completion

use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use cadence_core::{ClipRequest, RemoteControl, TokenSource};
use cadence_playback::simulated::{SimulatedBackend, SimulatedQuirks};
use cadence_playback::{
    ClipPlayer, PlayerBackend, PlayerSnapshot, SilentAudioContext, TokenProvider,
};
use cadence_remote::{
    PollingDeviceFactory, RemoteConfig, RemoteControlClient, TokenServiceClient,
    TokenServiceConfig,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Slack on top of the worst-case time to start a clip
const FINISH_GRACE: Duration = Duration::from_secs(10);

/// Collaborators backed by the real token service and remote control API
pub fn live_backend(config: &PreviewConfig) -> Result<PlayerBackend> {
    let tokens = live_tokens(config)?;
    let remote = live_remote(config, tokens.clone())?;
    let devices = Arc::new(PollingDeviceFactory::new(
        remote.clone(),
        config.poll_interval(),
    ));

    Ok(PlayerBackend {
        tokens,
        remote,
        devices,
        audio: Arc::new(SilentAudioContext),
    })
}

/// Token provider over the journal backend's token service
pub fn live_tokens(config: &PreviewConfig) -> Result<Arc<TokenProvider>> {
    let service_config = match &config.api.session_token {
        Some(session) => TokenServiceConfig::with_session(&config.api.token_url, session),
        None => TokenServiceConfig::new(&config.api.token_url),
    };
    let service = TokenServiceClient::new(service_config)?;

    Ok(Arc::new(TokenProvider::new(
        Arc::new(service),
        config.policy().credential_refresh_margin(),
    )))
}

/// Remote control client authenticated by `tokens`
pub fn live_remote(
    config: &PreviewConfig,
    tokens: Arc<dyn TokenSource>,
) -> Result<Arc<dyn RemoteControl>> {
    let client = RemoteControlClient::new(
        RemoteConfig::new(&config.api.base_url).with_timeout(config.request_timeout()),
        tokens,
    )?;
    Ok(Arc::new(client))
}

/// Collaborators backed by the in-process simulated service
///
/// The simulated device lists late and auto-pauses its first play, so a
/// preview shows the whole recovery path.
pub fn simulated_backend(config: &PreviewConfig) -> (PlayerBackend, SimulatedBackend) {
    let backend = SimulatedBackend::new(SimulatedQuirks {
        listing_lag: Duration::from_millis(800),
        auto_pause_glitches: 1,
        ..SimulatedQuirks::default()
    });
    let tokens = Arc::new(TokenProvider::new(
        Arc::new(backend.clone()),
        config.policy().credential_refresh_margin(),
    ));

    let player_backend = PlayerBackend {
        tokens,
        remote: Arc::new(backend.clone()),
        devices: Arc::new(backend.clone()),
        audio: Arc::new(backend.clone()),
    };
    (player_backend, backend)
}

/// Coarse phase of a snapshot, used to report transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Starting,
    Playing,
    Idle,
    NeedsReauth,
    NotPremium,
}

impl Phase {
    pub fn of(snapshot: &PlayerSnapshot) -> Self {
        if snapshot.needs_reauth {
            Phase::NeedsReauth
        } else if !snapshot.is_premium {
            Phase::NotPremium
        } else if snapshot.is_playing {
            Phase::Playing
        } else if snapshot.is_initializing && !snapshot.is_ready {
            Phase::Connecting
        } else if snapshot.is_initializing {
            Phase::Starting
        } else {
            Phase::Idle
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Connecting => "connecting device",
            Phase::Starting => "starting",
            Phase::Playing => "playing",
            Phase::Idle => "idle",
            Phase::NeedsReauth => "sign-in required",
            Phase::NotPremium => "premium account required",
        };
        f.write_str(label)
    }
}

/// How a clip preview ended
#[derive(Debug, Clone, PartialEq)]
pub enum ClipOutcome {
    /// Played until its end (or a pause)
    Finished(PlayerSnapshot),
    /// Never reached stable playback
    Abandoned(PlayerSnapshot),
}

/// Upper bound on how long `clip` may take from gesture to end
pub fn finish_deadline(player: &ClipPlayer, clip: &ClipRequest) -> Duration {
    let policy = player.policy();
    let retries: Duration = policy
        .retry_backoff_ms
        .iter()
        .map(|ms| Duration::from_millis(*ms))
        .sum();

    policy.handshake_deadline(true)
        + policy.not_found_retry_delay()
        + retries
        + Duration::from_millis(clip.duration_ms())
        + FINISH_GRACE
}

/// Play `clip` and wait until it ends, reporting each snapshot change
pub async fn run_clip(
    player: &ClipPlayer,
    clip: ClipRequest,
    mut on_change: impl FnMut(&PlayerSnapshot),
) -> Result<ClipOutcome> {
    let deadline = finish_deadline(player, &clip);
    let mut state = player.subscribe();

    let command = player.play_clip(clip)?;
    info!(command = %command, "Clip requested");

    let wait = async {
        let mut started = false;
        loop {
            let snapshot = state.borrow_and_update().clone();
            on_change(&snapshot);

            if snapshot.needs_reauth {
                return Err(PreviewError::Playback(
                    cadence_playback::PlaybackError::NeedsReauth,
                ));
            }
            if snapshot.is_playing {
                started = true;
            } else if started {
                return Ok(ClipOutcome::Finished(snapshot));
            } else if !snapshot.is_initializing {
                return Ok(ClipOutcome::Abandoned(snapshot));
            }

            if state.changed().await.is_err() {
                debug!("Player dropped while waiting for the clip");
                return Ok(ClipOutcome::Abandoned(player.snapshot()));
            }
        }
    };

    let requested_at = Instant::now();
    let outcome = tokio::time::timeout(deadline, wait)
        .await
        .map_err(|_| PreviewError::TimedOut(deadline))??;
    debug!(elapsed_ms = requested_at.elapsed().as_millis() as u64, "Clip preview over");
    Ok(outcome)
}
