//! Cadence Journal Core
//!
//! Platform-agnostic types, capability traits, and error handling shared by the
//! clip playback crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `ClipRequest`, `PlaybackCredential`, `DeviceState`, `RemoteDevice`
//! - **Capability Traits**: `TokenService`, `TokenSource`, `RemoteControl`,
//!   `DeviceSdk`, `DeviceSdkFactory`, `AudioContext`
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! The remote playback device is never touched directly: commands go through
//! [`RemoteControl`], observations arrive as [`SdkEvent`]s from a [`DeviceSdk`].
//! Any of these can be swapped for a fake or simulated implementation.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::ClipRequest;
//!
//! let clip = ClipRequest::new("entry-42", "track:4uLU6hMCjMI75M1A2tKUQC", 10.0, 25.0);
//! assert!(clip.validate().is_ok());
//! assert_eq!(clip.duration_ms(), 15_000);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CadenceError, Result};
pub use traits::{
    AudioContext, DeviceSdk, DeviceSdkFactory, RemoteControl, SdkHandle, TokenService,
    TokenSource,
};

pub use types::{
    ClipRequest, CommandId, ConnectionState, DeviceState, PlaybackCredential, RemoteDevice,
    SdkEvent, TokenGrant,
};
