//! Device adapter that derives SDK events from remote API polling.
//!
//! Hosts without an embedded playback SDK (CLI, server) still need the
//! `ready` / `player_state_changed` stream the engine consumes. This adapter
//! attaches to an existing device by name and polls the player state.

use cadence_core::{
    CadenceError, DeviceSdk, DeviceSdkFactory, DeviceState, RemoteControl, SdkEvent, SdkHandle,
    TokenSource,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Number of state polls between device presence checks
const PRESENCE_CHECK_EVERY: u32 = 10;

/// Creates [`PollingDevice`]s.
pub struct PollingDeviceFactory {
    remote: Arc<dyn RemoteControl>,
    poll_interval: Duration,
}

impl PollingDeviceFactory {
    pub fn new(remote: Arc<dyn RemoteControl>, poll_interval: Duration) -> Self {
        Self {
            remote,
            poll_interval,
        }
    }
}

impl DeviceSdkFactory for PollingDeviceFactory {
    fn create(
        &self,
        device_name: &str,
        _tokens: Arc<dyn TokenSource>,
    ) -> cadence_core::Result<SdkHandle> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let device = PollingDevice {
            name: device_name.to_string(),
            remote: Arc::clone(&self.remote),
            poll_interval: self.poll_interval,
            events: events_tx,
            task: Mutex::new(None),
        };

        Ok(SdkHandle {
            sdk: Arc::new(device),
            events: events_rx,
        })
    }
}

/// A device attached by name, observed through polling.
pub struct PollingDevice {
    name: String,
    remote: Arc<dyn RemoteControl>,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<SdkEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceSdk for PollingDevice {
    fn connect(&self) -> cadence_core::Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CadenceError::device("polling device requires a tokio runtime"))?;

        let task = runtime.spawn(poll_loop(
            self.name.clone(),
            Arc::clone(&self.remote),
            self.poll_interval,
            self.events.clone(),
        ));

        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn disconnect(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
            debug!(device = %self.name, "Polling device disconnected");
        }
    }

    fn activate_element(&self) {
        debug!(device = %self.name, "No playback element to activate for a polled device");
    }
}

impl Drop for PollingDevice {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn poll_loop(
    name: String,
    remote: Arc<dyn RemoteControl>,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<SdkEvent>,
) {
    let device_id = match find_device(remote.as_ref(), &name).await {
        Ok(id) => id,
        Err(event) => {
            let _ = events.send(event);
            return;
        }
    };

    info!(device = %name, device_id = %device_id, "Polling device ready");
    if events
        .send(SdkEvent::Ready {
            device_id: device_id.clone(),
        })
        .is_err()
    {
        return;
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last: Option<Option<DeviceState>> = None;
    let mut polls: u32 = 0;

    loop {
        ticker.tick().await;
        polls = polls.wrapping_add(1);

        if polls % PRESENCE_CHECK_EVERY == 0 {
            match remote.list_devices().await {
                Ok(devices) if !devices.iter().any(|d| d.id == device_id) => {
                    warn!(device_id = %device_id, "Polled device disappeared");
                    let _ = events.send(SdkEvent::NotReady { device_id });
                    return;
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Presence check failed"),
            }
        }

        match remote.playback_state().await {
            Ok(state) => {
                if last.as_ref() != Some(&state) {
                    last = Some(state.clone());
                    if events.send(SdkEvent::StateChanged { state }).is_err() {
                        return;
                    }
                }
            }
            Err(e) => debug!(error = %e, "Player state poll failed"),
        }
    }
}

/// Resolve a device id by display name (case-insensitive).
async fn find_device(remote: &dyn RemoteControl, name: &str) -> Result<String, SdkEvent> {
    match remote.list_devices().await {
        Ok(devices) => devices
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| d.id)
            .ok_or_else(|| SdkEvent::InitializationError {
                message: format!("no device named '{}' is visible to this account", name),
            }),
        Err(CadenceError::PremiumRequired) => Err(SdkEvent::AccountError {
            message: "premium account required".to_string(),
        }),
        Err(e) if e.is_credential_failure() => Err(SdkEvent::AuthenticationError {
            message: e.to_string(),
        }),
        Err(e) => Err(SdkEvent::InitializationError {
            message: e.to_string(),
        }),
    }
}
