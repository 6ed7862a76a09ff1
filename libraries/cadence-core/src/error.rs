/// Core error types for Cadence Journal playback
use thiserror::Error;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Error type shared across capability trait boundaries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CadenceError {
    /// The access token was rejected by the remote service
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The account link is gone; the user must re-link before playback works again
    #[error("Re-authentication required")]
    ReauthRequired,

    /// The account cannot use remote playback (non-premium)
    #[error("Premium account required")]
    PremiumRequired,

    /// The targeted device is not (yet) registered with the remote API
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device SDK reported an initialization, account or playback failure
    #[error("Device error: {0}")]
    Device(String),

    /// Rate limited by the remote API
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds the API asked us to wait
        retry_after_secs: u64,
    },

    /// Remote API returned an unexpected status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Network failure (connect, timeout, transport)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CadenceError {
    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error means the credential itself is unusable
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::ReauthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failure_classification() {
        assert!(CadenceError::ReauthRequired.is_credential_failure());
        assert!(CadenceError::Unauthorized("expired".into()).is_credential_failure());
        assert!(!CadenceError::network("timeout").is_credential_failure());
        assert!(!CadenceError::PremiumRequired.is_credential_failure());
    }

    #[test]
    fn test_display_messages() {
        let err = CadenceError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "API error (502): bad gateway");
        assert_eq!(
            CadenceError::RateLimited { retry_after_secs: 3 }.to_string(),
            "Rate limited, retry after 3 seconds"
        );
    }
}
