//! Configuration data model.
//!
//! This module holds struct definitions plus default values. Loader and
//! source-resolution logic remains in `config::mod` so parsing and precedence
//! behavior stays centralized.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT_SECS, DEFAULT_MAX_EVENTS,
    DEFAULT_POLL_CEILING_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REFRESH_DELAY_MS,
};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Resolved API settings (key sources already applied).
    pub api: ApiConfig,
    pub live: LiveConfig,
    pub display: DisplayConfig,
}

/// Resolved API connection settings used by the HTTP client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Whole-request timeout for REST calls; connect timeout for the stream.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            api_key: String::new(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

/// Live session timing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LiveConfig {
    pub poll_interval_ms: u64,
    pub poll_ceiling_secs: u64,
    pub refresh_delay_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_ceiling_secs: DEFAULT_POLL_CEILING_SECS,
            refresh_delay_ms: DEFAULT_REFRESH_DELAY_MS,
        }
    }
}

impl LiveConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_ceiling(&self) -> Duration {
        Duration::from_secs(self.poll_ceiling_secs)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

/// Display / rendering preferences.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
    /// Events rendered for the selected cycle; older ones are elided.
    pub max_events: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub(super) api: FileApiConfig,
    pub(super) live: LiveConfig,
    pub(super) display: DisplayConfig,
}

/// `[api]` table as written on disk, before key sources are resolved.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(super) struct FileApiConfig {
    pub(super) base_url: String,
    pub(super) api_key: String,
    pub(super) api_key_env: Option<String>,
    pub(super) timeout_secs: u64,
}

impl Default for FileApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            api_key: String::new(),
            api_key_env: None,
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

/// Result of explicit global config initialization (`runwatch init`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalConfigInitResult {
    Created {
        path: std::path::PathBuf,
    },
    AlreadyInitialized {
        path: std::path::PathBuf,
    },
    Overwritten {
        path: std::path::PathBuf,
        backup_path: std::path::PathBuf,
    },
}
