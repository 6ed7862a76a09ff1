/// Preview configuration
use crate::error::{PreviewError, Result};
use cadence_playback::PlaybackPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreviewConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub playback: PlaybackPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSettings {
    /// Remote control API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Journal backend holding the music account link
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Journal session of the signed-in user
    #[serde(default)]
    pub session_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Name of the playback device to drive
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Player state polling interval of the polling device adapter
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl PreviewConfig {
    /// Load configuration from file and process environment
    ///
    /// `path` must exist when given; otherwise `cadence.toml` is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Load configuration from file and an explicit environment
    ///
    /// `env` replaces the process environment when given. Variables carry the
    /// `CADENCE_` prefix and `__` between section and key, e.g.
    /// `CADENCE_API__BASE_URL` or `CADENCE_PLAYBACK__RETRY_BACKOFF_MS=300,600`.
    pub fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(PreviewError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("playback.retry_backoff_ms")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_url("api.base_url", &self.api.base_url)?;
        check_url("api.token_url", &self.api.token_url)?;

        if self.api.timeout_secs == 0 {
            return Err(PreviewError::Config(
                "api.timeout_secs must be positive".to_string(),
            ));
        }
        if self.device.name.trim().is_empty() {
            return Err(PreviewError::Config(
                "device.name cannot be empty".to_string(),
            ));
        }
        if self.device.poll_interval_ms == 0 {
            return Err(PreviewError::Config(
                "device.poll_interval_ms must be positive".to_string(),
            ));
        }

        self.policy()
            .validate()
            .map_err(|e| PreviewError::Config(format!("playback: {e}")))
    }

    /// Playback policy for the configured device
    pub fn policy(&self) -> PlaybackPolicy {
        PlaybackPolicy {
            device_name: self.device.name.clone(),
            ..self.playback.clone()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.device.poll_interval_ms)
    }
}

fn check_url(key: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| PreviewError::Config(format!("{key} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PreviewError::Config(format!(
            "{key} must use http or https, got {other}"
        ))),
    }
}

// Default values
fn default_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_token_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_device_name() -> String {
    PlaybackPolicy::default().device_name
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_url: default_token_url(),
            session_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
