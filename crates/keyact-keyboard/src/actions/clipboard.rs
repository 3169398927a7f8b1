//! Clipboard history action.
//!
//! A plain press pastes the most recent clip. The window lists the history
//! (pinned clips first) and pastes whatever is tapped.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

use keyact_api::{
    Action, ActionError, ActionWindow, Element, KeyboardConfig, KeyboardManagerForAction,
    PersistentActionState, WindowContents, WindowEvent,
};
use keyact_core::pref;

use super::ids;

// =============================================================================
// History
// =============================================================================

/// One clipboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clip {
    pub text: String,
    pub pinned: bool,
}

/// Text copied on the device, newest first.
///
/// Shared between the platform feed and the clipboard action. Unpinned
/// clips beyond `max_items` are evicted oldest first.
#[derive(Debug)]
pub struct ClipboardHistory {
    clips: Mutex<VecDeque<Clip>>,
    max_items: usize,
}

impl ClipboardHistory {
    pub fn new(max_items: usize) -> Self {
        Self {
            clips: Mutex::new(VecDeque::new()),
            max_items,
        }
    }

    /// Record copied text. Copying an existing clip moves it to the front.
    pub fn push(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut clips = self.clips.lock();
        let pinned = match clips.iter().position(|c| c.text == text) {
            Some(index) => clips.remove(index).is_some_and(|c| c.pinned),
            None => false,
        };
        clips.push_front(Clip {
            text: text.to_string(),
            pinned,
        });

        while clips.len() > self.max_items {
            match clips.iter().rposition(|c| !c.pinned) {
                Some(index) => {
                    clips.remove(index);
                }
                None => break,
            }
        }
    }

    /// Most recent clip.
    pub fn latest(&self) -> Option<String> {
        self.clips.lock().front().map(|c| c.text.clone())
    }

    /// Clips in display order: pinned first, then by recency.
    pub fn clips(&self) -> Vec<Clip> {
        let clips = self.clips.lock();
        let (mut pinned, rest): (Vec<Clip>, Vec<Clip>) =
            clips.iter().cloned().partition(|c| c.pinned);
        pinned.extend(rest);
        pinned
    }

    /// Flip the pin on the clip holding `text`.
    pub fn toggle_pin(&self, text: &str) -> bool {
        let mut clips = self.clips.lock();
        match clips.iter_mut().find(|c| c.text == text) {
            Some(clip) => {
                clip.pinned = !clip.pinned;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.clips.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.lock().is_empty()
    }
}

// =============================================================================
// Persistent State
// =============================================================================

/// Truncated labels for clips, computed on demand.
#[derive(Debug)]
struct PreviewCache {
    chars: usize,
    entries: Mutex<HashMap<String, String>>,
}

impl PreviewCache {
    fn preview(&self, text: &str) -> String {
        self.entries
            .lock()
            .entry(text.to_string())
            .or_insert_with(|| {
                let single_line = text.replace('\n', " ");
                let graphemes: Vec<&str> = single_line.graphemes(true).collect();
                if graphemes.len() <= self.chars {
                    single_line
                } else {
                    format!("{}...", graphemes[..self.chars].concat())
                }
            })
            .clone()
    }

    /// Drop previews of clips no longer in the history.
    fn retain(&self, clips: &[Clip]) {
        self.entries
            .lock()
            .retain(|text, _| clips.iter().any(|clip| clip.text == *text));
    }
}

/// State kept between clipboard windows: the history handle and a preview
/// cache that cleanup releases.
#[derive(Debug)]
pub struct ClipboardState {
    history: Arc<ClipboardHistory>,
    previews: Arc<PreviewCache>,
}

impl ClipboardState {
    pub fn new(history: Arc<ClipboardHistory>, preview_chars: usize) -> Self {
        Self {
            history,
            previews: Arc::new(PreviewCache {
                chars: preview_chars,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn history(&self) -> &Arc<ClipboardHistory> {
        &self.history
    }

    /// Number of cached previews.
    pub fn cached_previews(&self) -> usize {
        self.previews.entries.lock().len()
    }
}

#[async_trait]
impl PersistentActionState for ClipboardState {
    async fn clean_up(&self) -> Result<(), ActionError> {
        let released = {
            let mut entries = self.previews.entries.lock();
            let count = entries.len();
            entries.clear();
            entries.shrink_to_fit();
            count
        };
        tracing::debug!("Released {} clipboard previews", released);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Window
// =============================================================================

struct ClipboardWindow {
    history: Arc<ClipboardHistory>,
    previews: Arc<PreviewCache>,
}

impl ClipboardWindow {
    fn clip_at(&self, index: &str) -> Option<Clip> {
        let index: usize = index.parse().ok()?;
        self.history.clips().into_iter().nth(index)
    }
}

impl ActionWindow for ClipboardWindow {
    fn window_name(&self) -> String {
        format!("Clipboard ({})", self.history.len())
    }

    fn contents(&self, _keyboard_shown: bool) -> WindowContents {
        let clips = self.history.clips();
        if clips.is_empty() {
            return WindowContents::new().with(Element::text("Nothing copied yet"));
        }
        self.previews.retain(&clips);
        clips
            .iter()
            .enumerate()
            .fold(WindowContents::new(), |contents, (i, clip)| {
                contents.with(Element::row(vec![
                    Element::button(format!("paste:{}", i), self.previews.preview(&clip.text)),
                    Element::button(
                        format!("pin:{}", i),
                        if clip.pinned { "Unpin" } else { "Pin" },
                    ),
                ]))
            })
    }

    fn on_event(&self, host: &dyn KeyboardManagerForAction, event: WindowEvent) {
        let WindowEvent::Click(id) = event else {
            return;
        };
        if let Some(index) = id.strip_prefix("paste:") {
            if let Some(clip) = self.clip_at(index) {
                host.type_text(&clip.text);
                host.close_action_window();
            }
        } else if let Some(index) = id.strip_prefix("pin:") {
            if let Some(clip) = self.clip_at(index) {
                self.history.toggle_pin(&clip.text);
                host.trigger_content_update();
            }
        } else {
            tracing::debug!("Clipboard ignores click on {}", id);
        }
    }

    fn close(&self) {}
}

// =============================================================================
// Action
// =============================================================================

pub fn action(config: &KeyboardConfig, history: Arc<ClipboardHistory>) -> Action {
    let preview_chars = config.clipboard.preview_chars;
    let fallback = history.clone();

    Action::new(ids::CLIPBOARD, "clipboard", "Clipboard")
        .requires_pref(pref::ENABLE_CLIPBOARD_HISTORY)
        .with_simple_press(|host, state| {
            let latest = state
                .and_then(|s| s.downcast_ref::<ClipboardState>())
                .and_then(|s| s.history().latest());
            match latest {
                Some(text) => host.type_text(&text),
                None => tracing::debug!("Clipboard is empty, nothing to paste"),
            }
        })
        .with_window(move |_host, state| {
            let window = match state.and_then(|s| s.downcast_ref::<ClipboardState>()) {
                Some(state) => ClipboardWindow {
                    history: state.history.clone(),
                    previews: state.previews.clone(),
                },
                None => {
                    tracing::error!("Clipboard opened without its state");
                    let state = ClipboardState::new(fallback.clone(), preview_chars);
                    ClipboardWindow {
                        history: state.history,
                        previews: state.previews,
                    }
                }
            };
            Box::new(window)
        })
        .with_persistent_state(move |_host| {
            Arc::new(ClipboardState::new(history.clone(), preview_chars))
        })
}
