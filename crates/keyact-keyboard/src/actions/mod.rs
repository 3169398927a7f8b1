//! Built-in actions shown in the keyboard's action bar.
//!
//! Each submodule builds one family of [`Action`] descriptors. The bar
//! order comes from `actions.favorites` in the config; everything here is
//! registered regardless and gated at press time by its preference flag.

use std::sync::Arc;

use keyact_api::{Action, ActionError, ActionRegistry, KeyboardConfig};

pub mod clipboard;
pub mod system_voice;
pub mod text_edit;
pub mod theme_picker;
pub mod undo_redo;
pub mod voice_input;

pub use clipboard::{ClipboardHistory, ClipboardState};
pub use voice_input::VoiceInputState;

/// Stable action ids.
pub mod ids {
    pub const VOICE_INPUT: &str = "voice_input";
    pub const CLIPBOARD: &str = "clipboard";
    pub const THEME: &str = "theme";
    pub const UNDO: &str = "undo";
    pub const REDO: &str = "redo";
    pub const SYSTEM_VOICE_INPUT: &str = "system_voice_input";
    pub const TEXT_EDIT: &str = "text_edit";
}

/// Build every built-in action.
///
/// The clipboard action reads from the shared `clipboard` history, which the
/// platform (or the session driver) feeds with copied text.
pub fn builtin_actions(config: &KeyboardConfig, clipboard: Arc<ClipboardHistory>) -> Vec<Action> {
    vec![
        voice_input::action(),
        clipboard::action(config, clipboard),
        theme_picker::action(),
        undo_redo::undo(),
        undo_redo::redo(),
        system_voice::action(),
        text_edit::action(),
    ]
}

/// Register every built-in action, returning how many were added.
pub fn register_builtin_actions(
    registry: &ActionRegistry,
    config: &KeyboardConfig,
    clipboard: Arc<ClipboardHistory>,
) -> Result<usize, ActionError> {
    let actions = builtin_actions(config, clipboard);
    let count = actions.len();
    for action in actions {
        registry.register(action)?;
    }
    tracing::info!("Registered {} built-in actions", count);
    Ok(count)
}
