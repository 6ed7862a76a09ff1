//! Cadence Remote
//!
//! HTTP clients for the services clip playback depends on.
//!
//! # Features
//!
//! - **Token service**: exchange the journal session for a playback access token
//! - **Remote control**: list devices, transfer playback, play, pause, player state
//! - **Polling device**: SDK-style event stream for hosts without an embedded SDK
//!
//! All clients implement the capability traits from `cadence-core`, so the
//! playback engine never depends on this crate directly.
//!
//! # Example
//!
//! ```ignore
//! use cadence_remote::{RemoteConfig, RemoteControlClient, TokenServiceClient, TokenServiceConfig};
//!
//! let token_service = TokenServiceClient::new(TokenServiceConfig::with_session(
//!     "https://journal.example.com",
//!     session,
//! ))?;
//! let grant = token_service.fetch_token().await?;
//! println!("premium: {}", grant.premium);
//! ```

mod auth;
mod client;
mod error;
mod polling;
mod types;

pub use auth::TokenServiceClient;
pub use client::RemoteControlClient;
pub use error::{RemoteClientError, Result};
pub use polling::{PollingDevice, PollingDeviceFactory};
pub use types::{RemoteConfig, TokenServiceConfig};
