//! Credential exchange with the journal backend's token service.

use crate::client::normalize_url;
use crate::error::{map_send_error, RemoteClientError, Result};
use crate::types::TokenServiceConfig;
use async_trait::async_trait;
use cadence_core::{CadenceError, TokenGrant, TokenService};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Token service client.
///
/// The backend keeps the refresh token of the linked music account; this
/// client only ever sees short-lived access tokens.
pub struct TokenServiceClient {
    http: Client,
    base_url: String,
    session_token: Option<String>,
}

impl TokenServiceClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TokenServiceConfig) -> Result<Self> {
        let base_url = normalize_url(&config.url)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("CadenceJournal/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteClientError::Request)?;

        Ok(Self {
            http,
            base_url,
            session_token: config.session_token,
        })
    }

    /// Exchange the journal session for a playback access token.
    pub async fn fetch_token(&self) -> Result<TokenGrant> {
        let url = format!("{}/api/playback/token", self.base_url);
        debug!(url = %url, "Requesting playback token");

        let mut request = self.http.post(&url);
        if let Some(session) = &self.session_token {
            request = request.bearer_auth(session);
        }

        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();

        if status.is_success() {
            let grant: TokenGrant = response.json().await.map_err(|e| {
                RemoteClientError::ParseError(format!("Failed to parse token response: {}", e))
            })?;

            debug!(
                expires_in = grant.expires_in,
                premium = grant.premium,
                "Playback token received"
            );
            Ok(grant)
        } else if status == StatusCode::UNAUTHORIZED {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Token exchange failed: account link invalid");
            Err(RemoteClientError::Unauthorized(
                "Music account link expired or revoked".to_string(),
            ))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(RemoteClientError::ServerError {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }
}

#[async_trait]
impl TokenService for TokenServiceClient {
    async fn fetch_credential(&self) -> cadence_core::Result<TokenGrant> {
        self.fetch_token().await.map_err(|e| match e {
            RemoteClientError::Unauthorized(_) => CadenceError::ReauthRequired,
            other => other.into(),
        })
    }
}
