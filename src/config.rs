//! Client configuration
//!
//! Tunables for the paginator and upload pipeline, persisted as JSON in the
//! platform-specific config directory under "fedi-client/".

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::AuthenticationBox;

const APP_DIR_NAME: &str = "fedi-client";
const CONFIG_FILE_NAME: &str = "config.json";
const INSTANCE_URL_ENV: &str = "FEDI_CLIENT_INSTANCE_URL";

/// Delay before a failed feed load is retried
pub const FAIL_RETRY_DELAY_SECS: u64 = 3;
/// Progress weight of the media submission itself
pub const UPLOAD_UNITS: u64 = 540;
/// Progress weight of one processing-status check
pub const POLL_UNIT: u64 = 1;
/// Status checks before giving up on server-side processing
pub const MAX_POLL_RETRIES: u32 = 60;
/// Pause between status checks
pub const POLL_INTERVAL_SECS: u64 = 3;
/// Streaming chunk size for media bodies (1 MiB)
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Instance to talk to when no domain is supplied by the session
    pub instance_url: Option<String>,
    pub request_timeout_secs: u64,
    pub feed: FeedConfig,
    pub upload: UploadConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            instance_url: None,
            request_timeout_secs: 60,
            feed: FeedConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load `config.json` from the default config directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&get_config_dir()?)
    }

    /// Load `config.json` from `dir`. A missing file yields the defaults;
    /// `FEDI_CLIENT_INSTANCE_URL` overrides the stored instance.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let mut config: ClientConfig =
            load_json_file(&dir.join(CONFIG_FILE_NAME))?.unwrap_or_default();

        config.apply_instance_override(env::var(INSTANCE_URL_ENV).ok());
        Ok(config)
    }

    fn apply_instance_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            self.instance_url = Some(url.trim().to_string());
        }
    }

    /// Session for the configured instance
    pub fn session(&self, access_token: impl Into<String>) -> Result<AuthenticationBox, ConfigError> {
        let instance = self.instance_url.as_deref().ok_or(ConfigError::NoInstance)?;
        Ok(AuthenticationBox::new(instance, access_token))
    }

    /// Save as pretty JSON into `dir`, creating it if needed
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(CONFIG_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// User-Agent sent with every request
    pub fn user_agent(&self) -> String {
        format!("FediClient/{}", env!("CARGO_PKG_VERSION"))
    }
}

/// Paginator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub fail_retry_delay_secs: u64,
    /// Page size hint passed to the server
    pub page_limit: Option<u32>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fail_retry_delay_secs: FAIL_RETRY_DELAY_SECS,
            page_limit: None,
        }
    }
}

impl FeedConfig {
    pub fn fail_retry_delay(&self) -> Duration {
        Duration::from_secs(self.fail_retry_delay_secs)
    }
}

/// Upload pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub upload_units: u64,
    pub poll_unit: u64,
    pub max_poll_retries: u32,
    pub poll_interval_secs: u64,
    pub chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_units: UPLOAD_UNITS,
            poll_unit: POLL_UNIT,
            max_poll_retries: MAX_POLL_RETRIES,
            poll_interval_secs: POLL_INTERVAL_SECS,
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl UploadConfig {
    /// Progress budget fixed at pipeline start
    pub fn total_units(&self) -> u64 {
        self.upload_units + self.poll_unit * u64::from(self.max_poll_retries)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Get the app's config directory path.
///
/// Returns: `~/.config/fedi-client` (Linux)
///          `~/Library/Application Support/fedi-client` (macOS)
///          `C:\Users\<User>\AppData\Roaming\fedi-client` (Windows)
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APP_DIR_NAME))
}

/// Load JSON from `path`.
///
/// * `Ok(Some(data))` if the file exists and parses
/// * `Ok(None)` if it doesn't exist
/// * `Err(...)` if it exists but can't be read or parsed
fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let data = serde_json::from_str(&contents)?;
    Ok(Some(data))
}
