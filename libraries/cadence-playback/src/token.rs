//! Token provider - cached playback credential with single-flight refresh

use crate::error::TokenError;
use async_trait::async_trait;
use cadence_core::{CadenceError, PlaybackCredential, TokenService, TokenSource};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct TokenState {
    cached: Option<PlaybackCredential>,
    /// Last token handed out, kept across `invalidate` to detect rotation
    last_token: Option<String>,
    epoch: u64,
    needs_reauth: bool,
}

/// Owns the playback credential
///
/// The epoch increments whenever a refresh yields a different access token;
/// a device created under an older epoch must be torn down and recreated.
pub struct TokenProvider {
    service: Arc<dyn TokenService>,
    refresh_margin: Duration,
    state: Mutex<TokenState>,
    refresh: tokio::sync::Mutex<()>,
}

impl TokenProvider {
    pub fn new(service: Arc<dyn TokenService>, refresh_margin: Duration) -> Self {
        Self {
            service,
            refresh_margin,
            state: Mutex::new(TokenState::default()),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached credential, refreshing it when missing or about to expire
    ///
    /// # Errors
    /// `NeedsReauth` once a refresh has failed irrecoverably; the flag stays set
    /// until [`TokenProvider::clear`].
    pub async fn access_credential(&self) -> Result<PlaybackCredential, TokenError> {
        if let Some(credential) = self.valid_cached()? {
            return Ok(credential);
        }

        let _refreshing = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(credential) = self.valid_cached()? {
            return Ok(credential);
        }

        debug!("Refreshing playback credential");
        match self.service.fetch_credential().await {
            Ok(grant) => {
                let credential = PlaybackCredential::from_grant(grant, Instant::now());
                let mut state = self.lock();

                let rotated = state
                    .last_token
                    .as_deref()
                    .is_some_and(|previous| previous != credential.access_token);
                if rotated {
                    state.epoch += 1;
                    info!(epoch = state.epoch, "Playback credential rotated");
                }

                state.last_token = Some(credential.access_token.clone());
                state.cached = Some(credential.clone());
                state.needs_reauth = false;
                Ok(credential)
            }
            Err(e) if e.is_credential_failure() => {
                error!(error = %e, "Credential refresh failed; account must be re-linked");
                let mut state = self.lock();
                state.cached = None;
                state.needs_reauth = true;
                Err(TokenError::NeedsReauth)
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh failed");
                Err(TokenError::Unavailable(e))
            }
        }
    }

    fn valid_cached(&self) -> Result<Option<PlaybackCredential>, TokenError> {
        let state = self.lock();
        if state.needs_reauth {
            return Err(TokenError::NeedsReauth);
        }
        Ok(state
            .cached
            .as_ref()
            .filter(|c| c.is_valid(Instant::now(), self.refresh_margin))
            .cloned())
    }

    /// Cached credential without refreshing, valid or not
    pub fn cached(&self) -> Option<PlaybackCredential> {
        self.lock().cached.clone()
    }

    /// Current credential epoch
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Whether an irrecoverable refresh failure is pending
    pub fn needs_reauth(&self) -> bool {
        self.lock().needs_reauth
    }

    /// Drop the cached credential so the next call refreshes (e.g. after a 401)
    pub fn invalidate(&self) {
        self.lock().cached = None;
    }

    /// Forget everything, including the re-auth flag (sign-out, re-link)
    ///
    /// Starts a new epoch when a token had been handed out, so devices
    /// created under the old sign-in are recreated.
    pub fn clear(&self) {
        let mut state = self.lock();
        if state.last_token.take().is_some() {
            state.epoch += 1;
            debug!(epoch = state.epoch, "Credentials cleared");
        }
        state.cached = None;
        state.needs_reauth = false;
    }
}

#[async_trait]
impl TokenSource for TokenProvider {
    async fn access_token(&self) -> cadence_core::Result<String> {
        self.access_credential()
            .await
            .map(|credential| credential.access_token)
            .map_err(CadenceError::from)
    }
}
