//! Remote control API client.

use crate::error::{map_send_error, RemoteClientError, Result};
use crate::types::{
    ApiErrorBody, DevicesResponse, PlayRequest, PlayerStateResponse, RemoteConfig,
    TransferRequest,
};
use async_trait::async_trait;
use cadence_core::{DeviceState, RemoteControl, RemoteDevice, TokenSource};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the remote control API of the playback service.
///
/// Every request carries a bearer token pulled from the token source, so a
/// rotated credential is picked up on the next call.
///
/// # Example
///
/// ```ignore
/// use cadence_remote::{RemoteConfig, RemoteControlClient};
///
/// let client = RemoteControlClient::new(RemoteConfig::new("https://api.example.com/v1"), tokens)?;
/// for device in client.list_devices().await? {
///     println!("{} active={}", device.name, device.is_active);
/// }
/// ```
pub struct RemoteControlClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl RemoteControlClient {
    /// Create a new client with the given configuration.
    pub fn new(config: RemoteConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let base_url = normalize_url(&config.url)?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("CadenceJournal/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteClientError::Request)?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the devices visible to the account.
    pub async fn list_devices(&self) -> Result<Vec<RemoteDevice>> {
        let url = format!("{}/me/player/devices", self.base_url);
        debug!(url = %url, "Listing devices");

        let response = self.send(self.http.get(&url), None).await?;
        let body: DevicesResponse = response.json().await.map_err(|e| {
            RemoteClientError::ParseError(format!("Failed to parse device list: {}", e))
        })?;

        debug!(count = body.devices.len(), "Devices listed");
        Ok(body.devices)
    }

    /// Make `device_id` the active playback target.
    pub async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()> {
        let url = format!("{}/me/player", self.base_url);
        debug!(device_id = %device_id, play, "Transferring playback");

        let body = TransferRequest {
            device_ids: [device_id],
            play,
        };
        self.send(self.http.put(&url).json(&body), Some(device_id))
            .await?;

        info!(device_id = %device_id, "Playback transferred");
        Ok(())
    }

    /// Start `track_uri` at `position_ms` on `device_id`.
    pub async fn start_playback(
        &self,
        device_id: &str,
        track_uri: &str,
        position_ms: u64,
    ) -> Result<()> {
        let url = format!("{}/me/player/play", self.base_url);
        debug!(
            device_id = %device_id,
            track_uri = %track_uri,
            position_ms,
            "Starting playback"
        );

        let body = PlayRequest {
            uris: [track_uri],
            position_ms,
        };
        let request = self
            .http
            .put(&url)
            .query(&[("device_id", device_id)])
            .json(&body);
        self.send(request, Some(device_id)).await?;

        Ok(())
    }

    /// Pause playback on `device_id`.
    pub async fn pause(&self, device_id: &str) -> Result<()> {
        let url = format!("{}/me/player/pause", self.base_url);
        debug!(device_id = %device_id, "Pausing playback");

        let request = self.http.put(&url).query(&[("device_id", device_id)]);
        self.send(request, Some(device_id)).await?;

        Ok(())
    }

    /// Current player state of the account.
    ///
    /// Returns `None` when the API reports no active playback (204).
    pub async fn playback_state(&self) -> Result<Option<DeviceState>> {
        let url = format!("{}/me/player", self.base_url);

        let response = self.send(self.http.get(&url), None).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body: PlayerStateResponse = response.json().await.map_err(|e| {
            RemoteClientError::ParseError(format!("Failed to parse player state: {}", e))
        })?;

        Ok(Some(body.into()))
    }

    async fn send(&self, request: RequestBuilder, device_id: Option<&str>) -> Result<Response> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(RemoteClientError::Token)?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response, device_id).await
    }
}

/// Map non-success responses to typed errors.
async fn check_status(response: Response, device_id: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => {
            let message = error_message(response).await;
            warn!(status = %status, error = %message, "Access token rejected");
            Err(RemoteClientError::Unauthorized(message))
        }
        StatusCode::FORBIDDEN => Err(RemoteClientError::PremiumRequired),
        StatusCode::NOT_FOUND => Err(RemoteClientError::DeviceNotFound(
            device_id.unwrap_or_default().to_string(),
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1);
            Err(RemoteClientError::RateLimited { retry_after_secs })
        }
        _ => Err(RemoteClientError::ServerError {
            status: status.as_u16(),
            message: error_message(response).await,
        }),
    }
}

/// Extract the API's error message, falling back to the raw body.
async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text)
}

/// Validate a base URL and strip trailing slashes.
pub(crate) fn normalize_url(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(RemoteClientError::InvalidUrl("URL cannot be empty".into()));
    }

    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| RemoteClientError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(RemoteClientError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }

    Ok(trimmed.to_string())
}

#[async_trait]
impl RemoteControl for RemoteControlClient {
    async fn list_devices(&self) -> cadence_core::Result<Vec<RemoteDevice>> {
        RemoteControlClient::list_devices(self)
            .await
            .map_err(Into::into)
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> cadence_core::Result<()> {
        RemoteControlClient::transfer_playback(self, device_id, play)
            .await
            .map_err(Into::into)
    }

    async fn start_playback(
        &self,
        device_id: &str,
        track_uri: &str,
        position_ms: u64,
    ) -> cadence_core::Result<()> {
        RemoteControlClient::start_playback(self, device_id, track_uri, position_ms)
            .await
            .map_err(Into::into)
    }

    async fn pause(&self, device_id: &str) -> cadence_core::Result<()> {
        RemoteControlClient::pause(self, device_id)
            .await
            .map_err(Into::into)
    }

    async fn playback_state(&self) -> cadence_core::Result<Option<DeviceState>> {
        RemoteControlClient::playback_state(self)
            .await
            .map_err(Into::into)
    }
}
