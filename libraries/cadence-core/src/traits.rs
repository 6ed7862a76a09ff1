/// Capability traits for the external collaborators of clip playback
use crate::error::Result;
use crate::types::{DeviceState, RemoteDevice, SdkEvent, TokenGrant};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Credential exchange with the external auth service
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Obtain a fresh access token for the linked account
    ///
    /// # Errors
    /// `Unauthorized`/`ReauthRequired` when the account link is gone; network
    /// errors are transient.
    async fn fetch_credential(&self) -> Result<TokenGrant>;
}

/// Lazy access-token lookup handed to SDKs and HTTP clients
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current bearer token, refreshing it if needed
    async fn access_token(&self) -> Result<String>;
}

/// Remote control API of the playback service
///
/// All calls are suspension points; none of them block the caller of
/// `play_clip`.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// List the devices visible to the account
    async fn list_devices(&self) -> Result<Vec<RemoteDevice>>;

    /// Make `device_id` the active target, optionally starting playback
    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()>;

    /// Start `track_uri` at `position_ms` on `device_id`
    ///
    /// # Errors
    /// `DeviceNotFound` when the device is not registered yet.
    async fn start_playback(&self, device_id: &str, track_uri: &str, position_ms: u64)
        -> Result<()>;

    /// Pause playback on `device_id`
    async fn pause(&self, device_id: &str) -> Result<()>;

    /// Current player state of the account, `None` when nothing is playing
    async fn playback_state(&self) -> Result<Option<DeviceState>>;
}

/// A created, not necessarily connected, playback device
pub trait DeviceSdk: Send + Sync {
    /// Begin registration; readiness is reported later as [`SdkEvent::Ready`]
    ///
    /// Must return without awaiting so it can run inside an input gesture.
    fn connect(&self) -> Result<()>;

    /// Disconnect the device; no further events are emitted
    fn disconnect(&self);

    /// Activate the underlying playback element (mobile autoplay unlock)
    fn activate_element(&self);
}

/// A device together with the stream of events it emits
pub struct SdkHandle {
    /// The device
    pub sdk: Arc<dyn DeviceSdk>,

    /// Events emitted by the device, in order
    pub events: mpsc::UnboundedReceiver<SdkEvent>,
}

impl std::fmt::Debug for SdkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkHandle").finish_non_exhaustive()
    }
}

/// Creates playback devices
pub trait DeviceSdkFactory: Send + Sync {
    /// Create (but do not connect) a device named `device_name`
    ///
    /// The device pulls tokens from `tokens` whenever it needs one.
    fn create(&self, device_name: &str, tokens: Arc<dyn TokenSource>) -> Result<SdkHandle>;
}

/// Platform audio context used to satisfy autoplay policies
///
/// Both calls are synchronous so they can run inside the input gesture.
pub trait AudioContext: Send + Sync {
    /// Create or resume the audio context
    fn resume(&self) -> Result<()>;

    /// Play a near-silent buffer to prime audio output
    fn play_silent_buffer(&self) -> Result<()>;
}
