//! TOML-based engine configuration.
//!
//! Stores operational knobs:
//! - Sweep and reminder loop periods
//! - Cascade defaults (deadline window, penalty)
//! - Optional notification webhook
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Deadline sweeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep cycles.
    #[serde(default = "default_sweep_period")]
    pub period_secs: u64,
    /// Deadline window granted to cascade punishment assignments.
    #[serde(default = "default_cascade_hours")]
    pub cascade_deadline_hours: i64,
    /// Fixed penalty carried by cascade punishment assignments,
    /// independent of the task's own point value.
    #[serde(default = "default_cascade_penalty")]
    pub cascade_penalty: i64,
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between reminder cycles.
    #[serde(default = "default_reminder_period")]
    pub period_secs: u64,
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Webhook endpoint for best-effort delivery. None disables delivery.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Named channel for broadcast posts.
    #[serde(default)]
    pub channel: Option<String>,
}

/// Defaults applied when the adapter omits a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_point_value")]
    pub point_value: i64,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

fn default_sweep_period() -> u64 {
    300
}

fn default_cascade_hours() -> i64 {
    24
}

fn default_cascade_penalty() -> i64 {
    10
}

fn default_reminder_period() -> u64 {
    600
}

fn default_point_value() -> i64 {
    10
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            period_secs: default_sweep_period(),
            cascade_deadline_hours: default_cascade_hours(),
            cascade_penalty: default_cascade_penalty(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            period_secs: default_reminder_period(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            point_value: default_point_value(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep: SweepConfig::default(),
            reminders: ReminderConfig::default(),
            notifications: NotificationsConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl Config {
    /// Path of the config file.
    pub fn path() -> std::io::Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration, returning defaults if the file is absent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Save the configuration.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }
}
