//! End-to-end clip playback against the simulated backend
//!
//! The simulated service registers its device late, lists it later still,
//! and auto-pauses plays, so these runs exercise the whole path from gesture
//! to clip end.

mod common;

use cadence_core::ClipRequest;
use cadence_playback::simulated::{SimulatedBackend, SimulatedQuirks};
use cadence_playback::{ClipPlayer, PlaybackPolicy, PlayerBackend, TokenProvider};
use common::wait_until;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const TRACK: &str = "track:0VjIjW4GlUZAMYd2vXMi3b";

// ===== Helpers =====

fn player(policy: PlaybackPolicy, backend: &SimulatedBackend) -> ClipPlayer {
    let tokens = Arc::new(TokenProvider::new(
        Arc::new(backend.clone()),
        policy.credential_refresh_margin(),
    ));
    ClipPlayer::new(
        policy,
        PlayerBackend {
            tokens,
            remote: Arc::new(backend.clone()),
            devices: Arc::new(backend.clone()),
            audio: Arc::new(backend.clone()),
        },
    )
}

fn clip() -> ClipRequest {
    ClipRequest::new("entry-sim", TRACK, 30.0, 35.0)
}

// ===== Scenarios =====

#[tokio::test(start_paused = true)]
async fn test_lagging_device_with_glitch_plays_whole_clip() {
    let backend = SimulatedBackend::new(SimulatedQuirks {
        listing_lag: Duration::from_millis(800),
        auto_pause_glitches: 1,
        ..SimulatedQuirks::default()
    });
    let player = player(PlaybackPolicy::default(), &backend);
    let started = Instant::now();

    player.play_clip(clip()).unwrap();
    assert!(player.snapshot().is_initializing);

    wait_until("clip playing", || player.snapshot().is_playing).await;
    let snapshot = player.snapshot();
    assert_eq!(snapshot.device_id.as_deref(), Some("sim-device-1"));
    assert!(snapshot.position_ms >= 30_000);
    assert_eq!(backend.plays(), 2, "one glitch retry");
    assert_eq!(backend.transfers(), 1);

    wait_until("clip ended", || !player.snapshot().is_playing).await;
    let snapshot = player.snapshot();
    assert_eq!(snapshot.position_ms, 35_000);
    assert!(snapshot.current_clip.is_none());
    assert!(!player.timers_live());

    // Registration, listing lag and one retry all fit well inside ten seconds
    assert!(started.elapsed() < Duration::from_secs(10));

    wait_until("remote pause", || backend.pauses() == 1).await;
    assert_eq!(backend.primes(), 1);
    assert_eq!(backend.devices_created(), 1);
    assert!(backend.device_state().is_some_and(|state| state.paused));
}

#[tokio::test(start_paused = true)]
async fn test_not_found_first_play_recovers() {
    let backend = SimulatedBackend::new(SimulatedQuirks {
        not_found_plays: 1,
        ..SimulatedQuirks::default()
    });
    let player = player(PlaybackPolicy::default(), &backend);

    player.play_clip(clip()).unwrap();
    wait_until("clip playing", || player.snapshot().is_playing).await;

    assert_eq!(backend.plays(), 2);
    wait_until("clip ended", || !player.snapshot().is_playing).await;
    assert_eq!(player.snapshot().position_ms, 35_000);
}

#[tokio::test(start_paused = true)]
async fn test_second_clip_reuses_device_and_skips_handshake() {
    let backend = SimulatedBackend::new(SimulatedQuirks::default());
    let player = player(PlaybackPolicy::default(), &backend);

    player.play_clip(clip()).unwrap();
    wait_until("first clip playing", || player.snapshot().is_playing).await;
    let transfers = backend.transfers();

    player
        .play_clip(ClipRequest::new("entry-sim-2", TRACK, 60.0, 62.0))
        .unwrap();
    wait_until("second clip playing", || {
        player
            .snapshot()
            .current_clip
            .is_some_and(|c| c.entry_id == "entry-sim-2")
            && player.snapshot().is_playing
    })
    .await;

    assert_eq!(backend.devices_created(), 1);
    assert_eq!(backend.transfers(), transfers, "activation was cached");
    wait_until("second clip ended", || !player.snapshot().is_playing).await;
    assert_eq!(player.snapshot().position_ms, 62_000);
}
