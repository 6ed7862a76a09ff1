/// Preview error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PreviewError>;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote API error: {0}")]
    Remote(#[from] cadence_remote::RemoteClientError),

    #[error("Playback error: {0}")]
    Playback(#[from] cadence_playback::PlaybackError),

    #[error("Token error: {0}")]
    Token(#[from] cadence_playback::TokenError),

    #[error("Clip did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}

impl From<config::ConfigError> for PreviewError {
    fn from(err: config::ConfigError) -> Self {
        PreviewError::Config(err.to_string())
    }
}
