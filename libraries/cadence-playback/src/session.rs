//! Device session - lifecycle of the one registered playback device
//!
//! `uninitialized -> connecting -> ready -> {not_ready, disconnected}`

use cadence_core::{
    CadenceError, CommandId, ConnectionState, DeviceSdk, DeviceSdkFactory, SdkEvent, TokenSource,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The live device of an authenticated session
///
/// Each created device gets a new generation; events tagged with an older
/// generation come from a detached device and must be dropped.
pub struct DeviceSession {
    state: ConnectionState,
    device_id: Option<String>,
    sdk: Option<Arc<dyn DeviceSdk>>,
    listener: Option<JoinHandle<()>>,
    generation: u64,
    credential_epoch: u64,
    pending: Option<CommandId>,
    first_play_pending: bool,
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSession {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            device_id: None,
            sdk: None,
            listener: None,
            generation: 0,
            credential_epoch: 0,
            pending: None,
            first_play_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Credential epoch the device was created under
    pub fn credential_epoch(&self) -> u64 {
        self.credential_epoch
    }

    /// The created device, connected or not
    pub fn sdk(&self) -> Option<&Arc<dyn DeviceSdk>> {
        self.sdk.as_ref()
    }

    /// Create and connect a new device, tearing down any previous one first
    ///
    /// Returns the event stream of the new device; the caller pumps it and
    /// hands the task back through [`DeviceSession::attach_listener`].
    pub fn open(
        &mut self,
        factory: &dyn DeviceSdkFactory,
        device_name: &str,
        tokens: Arc<dyn TokenSource>,
        credential_epoch: u64,
    ) -> Result<mpsc::UnboundedReceiver<SdkEvent>, CadenceError> {
        self.teardown();

        let handle = factory.create(device_name, tokens)?;
        self.generation += 1;
        self.credential_epoch = credential_epoch;
        self.first_play_pending = true;

        if let Err(e) = handle.sdk.connect() {
            warn!(error = %e, "Device connect failed");
            handle.sdk.disconnect();
            self.state = ConnectionState::NotReady;
            return Err(e);
        }

        self.sdk = Some(handle.sdk);
        self.state = ConnectionState::Connecting;
        info!(
            generation = self.generation,
            device_name = %device_name,
            "Device session connecting"
        );

        Ok(handle.events)
    }

    /// Attach the task pumping this generation's events
    pub fn attach_listener(&mut self, listener: JoinHandle<()>) {
        if let Some(previous) = self.listener.replace(listener) {
            previous.abort();
        }
    }

    /// The SDK reported a device id; returns the queued intent to dispatch
    pub fn mark_ready(&mut self, device_id: String) -> Option<CommandId> {
        info!(device_id = %device_id, generation = self.generation, "Device session ready");
        self.state = ConnectionState::Ready;
        self.device_id = Some(device_id);
        self.pending.take()
    }

    /// Device lost or failed; any queued intent is discarded
    pub fn mark_not_ready(&mut self) -> Option<CommandId> {
        if self.state != ConnectionState::NotReady {
            info!(generation = self.generation, "Device session not ready");
        }
        self.state = ConnectionState::NotReady;
        self.device_id = None;
        self.pending.take()
    }

    /// Queue an intent to dispatch once the device is ready
    ///
    /// A newer intent replaces an older one.
    pub fn queue(&mut self, command: CommandId) {
        debug!(command = %command, "Queued until device ready");
        self.pending = Some(command);
    }

    pub fn pending(&self) -> Option<CommandId> {
        self.pending
    }

    /// Drop the queued intent without touching the device
    pub fn cancel_pending(&mut self) -> Option<CommandId> {
        self.pending.take()
    }

    /// Whether this is the first play attempt since the device was created
    pub fn take_first_play(&mut self) -> bool {
        std::mem::replace(&mut self.first_play_pending, false)
    }

    /// Detach listeners, disconnect the device and drop queued intent
    ///
    /// Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.pending = None;
        self.device_id = None;
        self.first_play_pending = false;

        if let Some(sdk) = self.sdk.take() {
            sdk.disconnect();
            self.state = ConnectionState::Disconnected;
            info!(generation = self.generation, "Device session torn down");
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
