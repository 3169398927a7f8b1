//! Configuration types.
//!
//! Configuration is read from `config.toml` in the Keyact config directory.
//! Every field has a default so a missing or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeyboardConfig {
    #[serde(default)]
    pub actions: ActionsConfig,

    #[serde(default)]
    pub appearance: AppearanceConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Action bar and lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActionsConfig {
    /// Upper bound on a single persistent-state cleanup.
    pub cleanup_timeout_ms: u64,

    /// Action ids pinned to the action bar, in order.
    pub favorites: Vec<String>,
}

impl ActionsConfig {
    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_millis(self.cleanup_timeout_ms)
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            cleanup_timeout_ms: 5000,
            favorites: ["voice_input", "clipboard", "undo", "redo", "text_edit", "theme"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Appearance configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Theme option key, e.g. "classic_dark"
    pub theme: String,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            theme: "classic_dark".to_string(),
        }
    }
}

/// Clipboard history settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClipboardConfig {
    pub max_items: usize,
    pub preview_chars: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            max_items: 25,
            preview_chars: 40,
        }
    }
}

/// Logging settings. `RUST_LOG` takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Background runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: 2 }
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("keyact"))
}

/// Get the path to config.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Load the configuration from the default location.
///
/// A missing file yields the default configuration.
pub fn load_config() -> Result<KeyboardConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

/// Load the configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<KeyboardConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {} - using defaults", path.display());
        return Ok(KeyboardConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    let config: KeyboardConfig =
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}
