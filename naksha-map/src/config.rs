//! Configuration loading for NakshaMap

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NakshaConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device capabilities and frame encryption
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeviceConfig {
    /// Device can only be reached through cloud storage (default: false)
    #[serde(default)]
    pub cloud_only: bool,

    /// Vision-SLAM device (default: false)
    #[serde(default)]
    pub vslam: bool,

    /// Vendor key for encrypted frames
    #[serde(default)]
    pub aes_key: Option<String>,

    /// AES IV for encrypted frames (all zero when absent)
    #[serde(default)]
    pub aes_iv: Option<String>,
}

/// Poll scheduling
#[derive(Clone, Debug, Deserialize)]
pub struct PollingConfig {
    /// Idle poll interval in seconds (default: 10)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Poll interval while cleaning in seconds (default: 2)
    #[serde(default = "default_cleaning_interval_secs")]
    pub cleaning_interval_secs: u64,

    /// Consecutive poll failures before `DeviceUpdateFailed` (default: 6)
    #[serde(default = "default_failure_budget")]
    pub failure_budget: u32,

    /// How long `disconnect` waits for the poller before detaching it (default: 500)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

/// Missing-frame recovery thresholds
#[derive(Clone, Debug, Deserialize)]
pub struct RecoveryConfig {
    /// Pending frames above which the missing frame is re-requested (default: 4)
    #[serde(default = "default_missing_frame_threshold")]
    pub missing_frame_threshold: usize,

    /// Pending frames above which a fresh Initial frame is requested (default: 8)
    #[serde(default = "default_initial_request_threshold")]
    pub initial_request_threshold: usize,

    /// Attempts before an explicit map request is abandoned (default: 6)
    #[serde(default = "default_request_retry_budget")]
    pub request_retry_budget: u32,
}

/// Cloud storage access
#[derive(Clone, Debug, Deserialize)]
pub struct CloudConfig {
    /// Download URL cache lifetime in seconds (default: 1800)
    #[serde(default = "default_file_url_ttl_secs")]
    pub file_url_ttl_secs: u64,

    /// Property history records per query (default: 20)
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Property key carrying map object names (default: "6.1")
    #[serde(default = "default_map_data_key")]
    pub map_data_key: String,

    /// Property key carrying the saved map list (default: "6.8")
    #[serde(default = "default_map_list_key")]
    pub map_list_key: String,
}

/// Optimistic edit handling
#[derive(Clone, Debug, Deserialize)]
pub struct EditorConfig {
    /// Debounce window for `on_update` after edits in milliseconds (default: 500)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Log output
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            cleaning_interval_secs: default_cleaning_interval_secs(),
            failure_budget: default_failure_budget(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            missing_frame_threshold: default_missing_frame_threshold(),
            initial_request_threshold: default_initial_request_threshold(),
            request_retry_budget: default_request_retry_budget(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            file_url_ttl_secs: default_file_url_ttl_secs(),
            history_limit: default_history_limit(),
            map_data_key: default_map_data_key(),
            map_list_key: default_map_list_key(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_interval_secs() -> u64 {
    10
}
fn default_cleaning_interval_secs() -> u64 {
    2
}
fn default_failure_budget() -> u32 {
    6
}
fn default_shutdown_timeout_ms() -> u64 {
    500
}
fn default_missing_frame_threshold() -> usize {
    4
}
fn default_initial_request_threshold() -> usize {
    8
}
fn default_request_retry_budget() -> u32 {
    6
}
fn default_file_url_ttl_secs() -> u64 {
    1800
}
fn default_history_limit() -> u32 {
    20
}
fn default_map_data_key() -> String {
    "6.1".to_string()
}
fn default_map_list_key() -> String {
    "6.8".to_string()
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl NakshaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: NakshaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 || self.polling.cleaning_interval_secs == 0 {
            return Err(Error::Config("poll intervals must be non-zero".to_string()));
        }
        if self.recovery.initial_request_threshold < self.recovery.missing_frame_threshold {
            return Err(Error::Config(
                "initial_request_threshold must not be below missing_frame_threshold".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval for the given cleaning state
    pub fn poll_interval(&self, cleaning: bool) -> Duration {
        if cleaning {
            Duration::from_secs(self.polling.cleaning_interval_secs)
        } else {
            Duration::from_secs(self.polling.interval_secs)
        }
    }
}
