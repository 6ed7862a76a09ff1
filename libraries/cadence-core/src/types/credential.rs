/// Playback credential types
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Response body of the token service credential exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Bearer token for the remote control API and device SDK
    pub access_token: String,

    /// Token validity in seconds
    pub expires_in: u64,

    /// Whether the linked account may use the remote play endpoint
    #[serde(default)]
    pub premium: bool,
}

/// Credential held by the token provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackCredential {
    /// Bearer token
    pub access_token: String,

    /// Non-premium accounts cannot start remote playback
    pub is_premium: bool,

    /// Instant after which the token must not be used
    pub expires_at: Instant,
}

impl PlaybackCredential {
    /// Build a credential from a grant received at `now`
    pub fn from_grant(grant: TokenGrant, now: Instant) -> Self {
        Self {
            access_token: grant.access_token,
            is_premium: grant.premium,
            expires_at: now + Duration::from_secs(grant.expires_in),
        }
    }

    /// Whether the credential is still usable at `now`, keeping `margin` in reserve
    pub fn is_valid(&self, now: Instant, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}
