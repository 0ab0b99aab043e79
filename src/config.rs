//! Configuration management for taskpad.
//!
//! This module handles the `config.yaml` file in the data directory, which
//! stores the reminder poll interval, the notification channel, and the
//! default list view.

use crate::error::Result;
use crate::paths;
use crate::reminders::dispatcher::{DEFAULT_CHANNEL_ID, DEFAULT_CHANNEL_NAME};
use crate::reminders::NotificationChannel;
use crate::view::{FilterMode, SortMode, ViewQuery};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const fn default_poll_interval_secs() -> u64 {
    30
}

fn default_channel_id() -> String {
    DEFAULT_CHANNEL_ID.to_string()
}

fn default_channel_name() -> String {
    DEFAULT_CHANNEL_NAME.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Seconds between reminder queue polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Notification channel identifier.
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// Notification channel display name.
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Filter used by `list` when none is given.
    #[serde(default)]
    pub default_filter: FilterMode,

    /// Sort used by `list` when none is given.
    #[serde(default)]
    pub default_sort: SortMode,

    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            channel_id: default_channel_id(),
            channel_name: default_channel_name(),
            default_filter: FilterMode::default(),
            default_sort: SortMode::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Load config from a data directory, returning None if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(data_dir: &Path) -> Result<Option<Self>> {
        let config_path = paths::config_path(data_dir);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Save config to a data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, data_dir: &Path) -> Result<()> {
        let config_path = paths::config_path(data_dir);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Delay between reminder queue polls. Never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// The notification channel reminders post to.
    #[must_use]
    pub fn channel(&self) -> NotificationChannel {
        NotificationChannel { id: self.channel_id.clone(), name: self.channel_name.clone() }
    }

    /// The list view used when nothing else is asked for.
    #[must_use]
    pub fn default_query(&self) -> ViewQuery {
        ViewQuery::new("", self.default_filter, self.default_sort)
    }
}

/// Ensure config exists in a data directory, creating it with defaults if not.
///
/// Returns the config (either loaded or newly created).
///
/// # Errors
///
/// Returns an error if config cannot be loaded or saved.
pub fn ensure_config_in(data_dir: &Path) -> Result<AppConfig> {
    if let Some(config) = AppConfig::load_from(data_dir)? {
        return Ok(config);
    }

    let config = AppConfig::default();
    config.save_to(data_dir)?;
    Ok(config)
}

/// Load config from a data directory, falling back to defaults if absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_or_default(data_dir: &Path) -> Result<AppConfig> {
    Ok(AppConfig::load_from(data_dir)?.unwrap_or_default())
}
