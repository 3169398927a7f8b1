//! The host facade every action receives.
//!
//! `KeyboardManagerForAction` is the only way an action touches the
//! keyboard: text injection, raw key events, transactions, theme changes,
//! closing its window and handing off to system dictation. All calls are
//! synchronous from the action's point of view.

use std::collections::VecDeque;
use std::sync::Arc;

use keyact_core::{
    KeyboardConfig, MemoryPreferences, MetaState, PlatformError, Preferences, ThemeOption,
    TransactionError,
};
use keyact_runtime::LifecycleScope;
use parking_lot::Mutex;
use serde::Serialize;

use crate::transaction::ActionInputTransaction;

/// Capability surface exposed to actions.
pub trait KeyboardManagerForAction: Send + Sync {
    /// Session context: configuration and preferences.
    fn context(&self) -> &KeyboardContext;

    /// Scope for background work that must not block the caller.
    fn lifecycle_scope(&self) -> &LifecycleScope;

    /// Ask the host to re-render and re-evaluate now.
    fn trigger_content_update(&self);

    /// Start a staged edit. Does not change the buffer.
    fn create_input_transaction(
        &self,
        apply_space_if_needed: bool,
    ) -> Box<dyn ActionInputTransaction>;

    /// Insert text immediately, bypassing transactions.
    fn type_text(&self, text: &str);

    /// Delete `amount` characters before the cursor.
    fn backspace(&self, amount: usize);

    /// Close whatever action window is open.
    fn close_action_window(&self);

    /// Hand off to the platform dictation facility. Fire-and-forget.
    fn trigger_system_voice_input(&self);

    /// Switch the active theme.
    fn update_theme(&self, theme: ThemeOption);

    /// Inject a code point as if its key was pressed.
    fn send_code_point_event(&self, code_point: i32);

    /// Inject a raw key event.
    fn send_key_event(&self, key_code: i32, meta_state: MetaState);
}

// =============================================================================
// Context
// =============================================================================

/// Read-mostly session context handed to actions.
#[derive(Clone)]
pub struct KeyboardContext {
    config: KeyboardConfig,
    preferences: Arc<dyn Preferences>,
}

impl KeyboardContext {
    pub fn new(config: KeyboardConfig, preferences: Arc<dyn Preferences>) -> Self {
        Self {
            config,
            preferences,
        }
    }

    pub fn config(&self) -> &KeyboardConfig {
        &self.config
    }

    pub fn preferences(&self) -> &dyn Preferences {
        self.preferences.as_ref()
    }
}

impl Default for KeyboardContext {
    fn default() -> Self {
        Self::new(KeyboardConfig::default(), Arc::new(MemoryPreferences::new()))
    }
}

impl std::fmt::Debug for KeyboardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardContext")
            .field("config", &self.config)
            .finish()
    }
}

// =============================================================================
// Platform
// =============================================================================

/// Platform services the facade delegates to.
#[cfg_attr(test, mockall::automock)]
pub trait PlatformBridge: Send + Sync {
    /// Launch the system dictation facility.
    fn launch_system_voice_input(&self) -> Result<(), PlatformError>;
}

/// A platform with no services available.
#[derive(Debug, Default)]
pub struct NoPlatform;

impl PlatformBridge for NoPlatform {
    fn launch_system_voice_input(&self) -> Result<(), PlatformError> {
        Err(PlatformError::VoiceInputUnavailable)
    }
}

// =============================================================================
// Notices
// =============================================================================

/// Problems the host reports on its side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostNotice {
    /// An action used a transaction after it ended.
    TransactionMisuse {
        transaction: u64,
        operation: String,
        #[serde(serialize_with = "serialize_display")]
        error: TransactionError,
    },
    /// A platform call failed.
    PlatformFailure { message: String },
    /// A persistent state failed to clean up.
    CleanupFailure { action: String, message: String },
}

fn serialize_display<S: serde::Serializer>(
    err: &TransactionError,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Notices kept before the oldest is dropped.
pub const MAX_NOTICES: usize = 256;

/// Bounded notice log. Keeps the most recent [`MAX_NOTICES`] entries.
#[derive(Debug, Default)]
pub(crate) struct Notices {
    entries: Mutex<VecDeque<HostNotice>>,
}

impl Notices {
    pub fn push(&self, notice: HostNotice) {
        let mut entries = self.entries.lock();
        if entries.len() == MAX_NOTICES {
            entries.pop_front();
        }
        entries.push_back(notice);
    }

    pub fn snapshot(&self) -> Vec<HostNotice> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn drain(&self) -> Vec<HostNotice> {
        self.entries.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Notice log shared between the host and its transactions.
pub(crate) type NoticeLog = Arc<Notices>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(n: usize) -> HostNotice {
        HostNotice::PlatformFailure {
            message: format!("failure {}", n),
        }
    }

    #[test]
    fn test_notices_keep_most_recent() {
        let notices = Notices::default();
        for n in 0..MAX_NOTICES + 3 {
            notices.push(failure(n));
        }

        let kept = notices.snapshot();
        assert_eq!(kept.len(), MAX_NOTICES);
        assert_eq!(kept[0], failure(3));
        assert_eq!(kept[MAX_NOTICES - 1], failure(MAX_NOTICES + 2));
    }

    #[test]
    fn test_drain_empties_log() {
        let notices = Notices::default();
        notices.push(failure(0));

        assert_eq!(notices.drain(), vec![failure(0)]);
        assert_eq!(notices.len(), 0);
        assert!(notices.snapshot().is_empty());
    }
}
