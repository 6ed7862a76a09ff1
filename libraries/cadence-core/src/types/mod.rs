mod clip;
mod credential;
mod device;
mod ids;
mod playback_state;

pub use clip::ClipRequest;
pub use credential::{PlaybackCredential, TokenGrant};
pub use device::{RemoteDevice, SdkEvent};
pub use ids::CommandId;
pub use playback_state::{ConnectionState, DeviceState};
