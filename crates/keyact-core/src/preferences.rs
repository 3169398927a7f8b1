//! Preference flags consulted by the action system.
//!
//! Storage and the settings screens that edit these values live outside
//! this crate. Actions only see opaque boolean and string values by key.

use parking_lot::RwLock;
use std::collections::HashMap;

/// A boolean preference with its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefKey {
    pub key: &'static str,
    pub default: bool,
}

impl PrefKey {
    pub const fn new(key: &'static str, default: bool) -> Self {
        Self { key, default }
    }

    /// Read the flag, falling back to its default when unset.
    pub fn read(&self, prefs: &dyn Preferences) -> bool {
        prefs.get_bool(self.key).unwrap_or(self.default)
    }
}

/// Known preference keys.
pub mod pref {
    use super::PrefKey;

    pub const USE_TRANSFORMER_LM: PrefKey = PrefKey::new("use_transformer_lm", true);
    pub const AUTO_CORRECTION: PrefKey = PrefKey::new("auto_correction", true);
    pub const SHOW_SUGGESTIONS: PrefKey = PrefKey::new("show_suggestions", true);
    pub const BLOCK_POTENTIALLY_OFFENSIVE: PrefKey =
        PrefKey::new("block_potentially_offensive", true);
    pub const USE_PERSONALIZED_DICTS: PrefKey = PrefKey::new("use_personalized_dicts", true);
    pub const BIGRAM_PREDICTIONS: PrefKey = PrefKey::new("bigram_predictions", true);

    pub const ENABLE_VOICE_INPUT: PrefKey = PrefKey::new("enable_voice_input", true);
    pub const ENABLE_CLIPBOARD_HISTORY: PrefKey = PrefKey::new("enable_clipboard_history", true);
}

/// Read/write access to stored preferences.
pub trait Preferences: Send + Sync {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&self, key: &str, value: bool);
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str);
}

#[derive(Debug, Clone)]
enum PrefValue {
    Bool(bool),
    Text(String),
}

/// In-memory preferences, used by tests and the session driver.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, PrefValue>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.read().get(key) {
            Some(PrefValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    fn set_bool(&self, key: &str, value: bool) {
        tracing::debug!("Set preference {} = {}", key, value);
        self.values
            .write()
            .insert(key.to_string(), PrefValue::Bool(value));
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.read().get(key) {
            Some(PrefValue::Text(v)) => Some(v.clone()),
            _ => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) {
        self.values
            .write()
            .insert(key.to_string(), PrefValue::Text(value.to_string()));
    }
}
