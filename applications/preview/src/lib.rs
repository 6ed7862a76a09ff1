//! Cadence Preview Library
//!
//! Command-line host for clip playback: configuration, backend wiring and a
//! driver that plays one clip to completion.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types for convenience
pub use config::PreviewConfig;
pub use error::{PreviewError, Result};
pub use runner::{run_clip, ClipOutcome, Phase};
