//! Configuration file parsing and on-disk locations for ccmon.
//!
//! State lives under `~/.ccmon` (override with the `CCMON_DIR` env var):
//! the shared session snapshot at `sessions.json` and the notification
//! settings at `config.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Desktop notification toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Master switch; the per-event toggles are ignored while this is off
    pub enabled: bool,
    /// Notify when a session starts waiting on a permission prompt
    pub on_permission_prompt: bool,
    /// Notify when a session finishes responding
    pub on_session_complete: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            on_permission_prompt: true,
            on_session_complete: true,
        }
    }
}

/// Main configuration struct for ccmon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Desktop notification settings
    pub notifications: NotificationSettings,
}

impl Config {
    /// Load configuration from `~/.ccmon/config.json`.
    ///
    /// - If the file doesn't exist, returns default configuration.
    /// - If the file contains invalid JSON, logs a warning and returns default.
    /// - If some fields are missing, uses defaults for those fields.
    pub fn load() -> Config {
        Self::load_from(&config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Config {
        if !path.exists() {
            return Config::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                eprintln!(
                    "Warning: Invalid JSON in {}: {}, using default config",
                    path.display(),
                    e
                );
                Config::default()
            }),
            Err(e) => {
                eprintln!(
                    "Warning: Could not read {}: {}, using default config",
                    path.display(),
                    e
                );
                Config::default()
            }
        }
    }

    /// Parse configuration from a JSON string.
    ///
    /// Missing fields will use their default values due to `#[serde(default)]`.
    pub fn from_json(json: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Save configuration to `~/.ccmon/config.json`.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Save configuration to an explicit path, creating the directory
    /// (owner-only) on first use.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_private_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        restrict_file(path)?;
        Ok(())
    }
}

/// Returns the base directory for ccmon state: `~/.ccmon`.
///
/// Respects `CCMON_DIR` env var override for test isolation.
pub fn base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CCMON_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ccmon")
}

/// Returns the path of the shared session snapshot: `~/.ccmon/sessions.json`.
pub fn store_path() -> PathBuf {
    base_dir().join("sessions.json")
}

/// Returns the path of the settings file: `~/.ccmon/config.json`.
pub fn config_path() -> PathBuf {
    base_dir().join("config.json")
}

/// Creates `dir` with owner-only permissions if it does not exist yet.
#[cfg(unix)]
pub(crate) fn ensure_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

#[cfg(not(unix))]
pub(crate) fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

/// Restricts a file to owner read/write.
#[cfg(unix)]
pub(crate) fn restrict_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub(crate) fn restrict_file(_path: &Path) -> Result<()> {
    Ok(())
}
