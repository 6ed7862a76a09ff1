//! Cadence Journal - Clip Playback
//!
//! Starts and stops bounded clips of a track on a remote playback device the
//! application does not control, and reconciles local state with what the
//! device reports.
//!
//! This crate provides:
//! - Token provider (cached credential, single-flight refresh, re-auth flag)
//! - Device session lifecycle (create, connect, listen, teardown)
//! - Activation handshake with a short-lived confirmation cache
//! - Stabilization of reported device state (transient auto-pause detection)
//! - Clip timers anchored to the confirmed start
//! - Gesture-scoped audio unlock
//! - The [`ClipPlayer`] orchestrator and its observable [`PlayerSnapshot`]
//! - A simulated backend for tests and offline previews
//!
//! # Architecture
//!
//! `cadence-playback` never talks HTTP or drives audio itself. Collaborators
//! are the capability traits of `cadence-core`:
//! - [`cadence_core::TokenService`] for credential exchange
//! - [`cadence_core::RemoteControl`] for device commands
//! - [`cadence_core::DeviceSdkFactory`] for devices and their event streams
//! - [`cadence_core::AudioContext`] for autoplay unlock
//!
//! `cadence-remote` provides HTTP implementations; [`simulated`] provides an
//! in-process one.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::ClipRequest;
//! use cadence_playback::simulated::{SimulatedBackend, SimulatedQuirks};
//! use cadence_playback::{ClipPlayer, PlaybackPolicy, PlayerBackend, TokenProvider};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), cadence_playback::PlaybackError> {
//! let policy = PlaybackPolicy::default();
//! let backend = SimulatedBackend::new(SimulatedQuirks::default());
//! let tokens = Arc::new(TokenProvider::new(
//!     Arc::new(backend.clone()),
//!     policy.credential_refresh_margin(),
//! ));
//!
//! let player = ClipPlayer::new(
//!     policy,
//!     PlayerBackend {
//!         tokens,
//!         remote: Arc::new(backend.clone()),
//!         devices: Arc::new(backend.clone()),
//!         audio: Arc::new(backend),
//!     },
//! );
//!
//! let mut state = player.subscribe();
//! player.play_clip(ClipRequest::new("entry-1", "track:abc", 10.0, 25.0))?;
//!
//! while state.changed().await.is_ok() {
//!     let snapshot = state.borrow().clone();
//!     if snapshot.is_playing {
//!         println!("at {} ms", snapshot.position_ms);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handshake;
pub mod listener;
pub mod player;
pub mod session;
pub mod simulated;
pub mod state;
pub mod timers;
pub mod token;
pub mod unlock;

// Re-exports
pub use config::{Platform, PlaybackPolicy, MAX_GLITCH_RETRIES};
pub use error::{PlaybackError, Result, TokenError};
pub use handshake::{ActivationCache, ActivationHandshake, HandshakeOutcome};
pub use listener::{StabilityTracker, StabilityWindow, Verdict};
pub use player::{ClipPlayer, PlayerBackend};
pub use session::DeviceSession;
pub use state::{PauseReason, PlayerSnapshot};
pub use timers::ClipTimers;
pub use token::TokenProvider;
pub use unlock::{GestureUnlock, SilentAudioContext, UnlockOutcome};
