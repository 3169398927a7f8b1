//! Core types for the Keyact keyboard action system.
//!
//! This crate contains shared data structures that are used across all Keyact crates:
//! - Error types
//! - Configuration types
//! - Theme options
//! - Key codes and meta-state flags
//! - Preference keys and the preferences interface

mod config;
mod error;
mod key;
mod preferences;
mod theme;

pub use config::{
    config_dir, config_path, load_config, load_config_from, ActionsConfig, AppearanceConfig,
    ClipboardConfig, KeyboardConfig, LoggingConfig, RuntimeConfig,
};
pub use error::{ActionError, ConfigError, PlatformError, TransactionError};
pub use key::{code, keycode, MetaState};
pub use preferences::{pref, MemoryPreferences, PrefKey, Preferences};
pub use theme::{ThemeMode, ThemeOption, THEMES};
