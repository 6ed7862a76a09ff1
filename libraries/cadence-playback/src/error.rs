//! Error types for clip playback

use cadence_core::CadenceError;
use thiserror::Error;

/// Errors surfaced by the clip player
///
/// Only `NeedsReauth` and `PremiumRequired` are meant for the user; the rest
/// degrade silently and can be retried with another gesture.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The account link must be renewed before playback works again
    #[error("Music account needs to be re-linked")]
    NeedsReauth,

    /// The account cannot use remote playback
    #[error("Clip preview requires a premium account")]
    PremiumRequired,

    /// The clip request is malformed
    #[error("Invalid clip request: {0}")]
    InvalidClip(String),

    /// No usable playback device
    #[error("Playback device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A call to an external collaborator failed
    #[error(transparent)]
    Remote(#[from] CadenceError),
}

/// Errors from the token provider
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Refresh failed irrecoverably; the account must be re-linked
    #[error("Re-authentication required")]
    NeedsReauth,

    /// Refresh failed for a reason that may go away (network, server)
    #[error("Credential unavailable: {0}")]
    Unavailable(CadenceError),
}

impl From<TokenError> for PlaybackError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NeedsReauth => PlaybackError::NeedsReauth,
            TokenError::Unavailable(inner) => PlaybackError::Remote(inner),
        }
    }
}

impl From<TokenError> for CadenceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NeedsReauth => CadenceError::ReauthRequired,
            TokenError::Unavailable(inner) => inner,
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
