//! Voice input action.
//!
//! Opens a listening window that streams recognised speech into the field
//! through an input transaction. Partial hypotheses replace each other in
//! the composing region; "done" commits the last one and "cancel" (or any
//! other close) discards it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use keyact_api::{
    Action, ActionError, ActionInputTransaction, ActionWindow, Element, KeyboardManagerForAction,
    PersistentActionState, WindowContents, WindowEvent,
};
use keyact_core::pref;

use super::ids;

// =============================================================================
// Persistent State
// =============================================================================

/// Loaded recognition model, kept between windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechModel {
    pub language: String,
}

/// Keeps the speech model loaded across voice input sessions.
#[derive(Debug, Default)]
pub struct VoiceInputState {
    model: Mutex<Option<SpeechModel>>,
    loads: AtomicUsize,
}

impl VoiceInputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the loaded model, loading it first if needed.
    pub fn ensure_model(&self) -> SpeechModel {
        let mut model = self.model.lock();
        if let Some(loaded) = model.as_ref() {
            return loaded.clone();
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        let loaded = SpeechModel {
            language: "en-US".to_string(),
        };
        tracing::info!("Loaded speech model for {}", loaded.language);
        *model = Some(loaded.clone());
        loaded
    }

    pub fn is_loaded(&self) -> bool {
        self.model.lock().is_some()
    }

    /// How many times the model has been loaded.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistentActionState for VoiceInputState {
    async fn clean_up(&self) -> Result<(), ActionError> {
        if let Some(model) = self.model.lock().take() {
            tracing::info!("Unloaded speech model for {}", model.language);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Window
// =============================================================================

struct VoiceInputWindow {
    language: String,
    transaction: Mutex<Option<Box<dyn ActionInputTransaction>>>,
    heard: Mutex<String>,
}

impl VoiceInputWindow {
    fn finish(&self, host: &dyn KeyboardManagerForAction) {
        let transaction = self.transaction.lock().take();
        if let Some(mut transaction) = transaction {
            let heard = self.heard.lock().clone();
            let result = if heard.is_empty() {
                transaction.cancel()
            } else {
                transaction.commit(&heard)
            };
            if let Err(e) = result {
                tracing::warn!("Voice input could not finish: {}", e);
            }
        }
        host.close_action_window();
    }
}

impl ActionWindow for VoiceInputWindow {
    fn window_name(&self) -> String {
        "Voice Input".to_string()
    }

    fn contents(&self, _keyboard_shown: bool) -> WindowContents {
        let heard = self.heard.lock();
        let status = if heard.is_empty() {
            format!("Listening ({})", self.language)
        } else {
            heard.clone()
        };
        WindowContents::new()
            .with(Element::text(status))
            .with(Element::row(vec![
                Element::button("cancel", "Cancel"),
                Element::button("done", "Done"),
            ]))
    }

    fn on_event(&self, host: &dyn KeyboardManagerForAction, event: WindowEvent) {
        match event {
            WindowEvent::Text(hypothesis) => {
                let mut transaction = self.transaction.lock();
                let Some(transaction) = transaction.as_mut() else {
                    return;
                };
                match transaction.update_partial(&hypothesis) {
                    Ok(()) => *self.heard.lock() = hypothesis,
                    Err(e) => tracing::warn!("Dropping recognised text: {}", e),
                }
                host.trigger_content_update();
            }
            WindowEvent::Click(id) if id == "done" => self.finish(host),
            WindowEvent::Click(id) if id == "cancel" => host.close_action_window(),
            WindowEvent::Click(id) => tracing::debug!("Voice input ignores click on {}", id),
        }
    }

    fn close(&self) {
        let transaction = self.transaction.lock().take();
        if let Some(mut transaction) = transaction {
            if let Err(e) = transaction.cancel() {
                tracing::debug!("Voice transaction already ended: {}", e);
            }
        }
    }
}

// =============================================================================
// Action
// =============================================================================

pub fn action() -> Action {
    Action::new(ids::VOICE_INPUT, "mic", "Voice Input")
        .requires_pref(pref::ENABLE_VOICE_INPUT)
        .with_window(|host, state| {
            let language = match state.and_then(|s| s.downcast_ref::<VoiceInputState>()) {
                Some(state) => state.ensure_model().language,
                None => {
                    tracing::error!("Voice input opened without its state");
                    "en-US".to_string()
                }
            };
            Box::new(VoiceInputWindow {
                language,
                transaction: Mutex::new(Some(host.create_input_transaction(true))),
                heard: Mutex::new(String::new()),
            })
        })
        .with_persistent_state(|_host| std::sync::Arc::new(VoiceInputState::new()))
}
