//! Keyboard Host
//!
//! `KeyboardHost` is the reference implementation of
//! [`KeyboardManagerForAction`]. It owns the input session, the observable
//! surface and the persistent-state ledger, and runs the invocation
//! protocol:
//!
//! ```text
//! press(action, gesture)
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │ resolve handler      │── neither declared ──► NoOp
//! └─────────┬────────────┘
//!           │
//!      ┌────┴─────┐
//!      ▼          ▼
//!  simple     window
//!  press      open
//!      │          │
//!      │     close current window
//!      │          │
//!      ▼          ▼
//! fetch-or-create persistent state
//!      │          │
//!      ▼          ▼
//!  run handler  run factory, present window
//! ```
//!
//! No lock is held while action code runs, so handlers and windows may call
//! back into the host freely.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use keyact_core::{code, keycode, ActionError, MetaState, ThemeOption, THEMES};
use keyact_runtime::LifecycleScope;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::action::{Action, InvokeOutcome, PressGesture, Resolved};
use crate::buffer::{ForwardedKey, InputBuffer};
use crate::host::{
    HostNotice, KeyboardContext, KeyboardManagerForAction, NoPlatform, NoticeLog, PlatformBridge,
};
use crate::registry::ActionRegistry;
use crate::state::PersistentActionState;
use crate::transaction::{ActionInputTransaction, BufferTransaction, InputSession, SharedInput};
use crate::window::{OpenWindow, WindowContents, WindowEvent};

mod ledger;
mod observable_surface;

use ledger::StateLedger;
use observable_surface::ObservableSurface;
pub use observable_surface::{SurfaceState, WindowState};

// =============================================================================
// Keyboard Host
// =============================================================================

/// One keyboard session hosting actions.
pub struct KeyboardHost {
    context: KeyboardContext,
    scope: LifecycleScope,
    registry: Arc<ActionRegistry>,
    platform: Arc<dyn PlatformBridge>,

    /// Buffer and live transaction. Shared with transactions.
    input: SharedInput,

    /// Side channel for misuse and platform failures.
    notices: NoticeLog,

    /// Open window, theme, visibility. Observable.
    surface: ObservableSurface,

    /// Persistent states and window ownership.
    ledger: Arc<Mutex<StateLedger>>,
}

impl KeyboardHost {
    /// Create a host with the given context, scope and registry.
    pub fn new(
        context: KeyboardContext,
        scope: LifecycleScope,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        let theme_key = &context.config().appearance.theme;
        let theme = ThemeOption::by_key(theme_key).unwrap_or_else(|| {
            tracing::warn!("Unknown theme '{}' - using {}", theme_key, THEMES[0].key);
            THEMES[0]
        });

        Self {
            context,
            scope,
            registry,
            platform: Arc::new(NoPlatform),
            input: Arc::new(Mutex::new(InputSession::new(InputBuffer::new()))),
            notices: NoticeLog::default(),
            surface: ObservableSurface::new(theme),
            ledger: Arc::new(Mutex::new(StateLedger::new())),
        }
    }

    /// Use the given platform services.
    pub fn with_platform(mut self, platform: Arc<dyn PlatformBridge>) -> Self {
        self.platform = platform;
        self
    }

    /// Start with text already in the field, cursor at the end.
    pub fn with_text(self, text: &str) -> Self {
        *self.input.lock() = InputSession::new(InputBuffer::with_text(text));
        self
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Invoke an action for a press.
    pub fn invoke(&self, id: &str, gesture: PressGesture) -> Result<InvokeOutcome, ActionError> {
        let action = self
            .registry
            .get(id)
            .ok_or_else(|| ActionError::ActionNotFound(id.to_string()))?;

        match action.resolve(gesture) {
            Resolved::NoOp => {
                tracing::debug!("Action '{}' has no handlers, ignoring press", action.id);
                Ok(InvokeOutcome::NoOp)
            }
            Resolved::SimplePress(handler) => {
                self.ledger.lock().begin_press(action.id)?;
                let _press = PressGuard {
                    ledger: &*self.ledger,
                    id: action.id,
                };
                let state = self.state_for(&action);

                tracing::debug!("Running simple press of action '{}'", action.id);
                handler(self, state.as_deref());
                Ok(InvokeOutcome::SimplePress)
            }
            Resolved::Window(factory) => {
                self.ledger.lock().begin_open(action.id)?;
                let mut opening = OpeningGuard {
                    ledger: &*self.ledger,
                    id: action.id,
                    armed: true,
                };

                // One window at a time: the previous one closes first
                self.close_window();

                let state = self.state_for(&action);
                let window = factory(self, state.as_deref());
                let open = Arc::new(OpenWindow::new(
                    action.id,
                    action.can_show_keyboard,
                    Arc::from(window),
                ));
                let window_id = open.id.clone();

                if let Some(replaced) = self.surface.open(open) {
                    // Only reachable if the factory bypassed the host
                    tracing::error!(
                        "Window of action '{}' was still open when '{}' opened",
                        replaced.action_id,
                        action.id
                    );
                    self.ledger.lock().window_closed(replaced.action_id);
                    replaced.close();
                }
                self.ledger.lock().finish_open(action.id);
                opening.armed = false;

                tracing::debug!("Opened window {} for action '{}'", window_id, action.id);
                Ok(InvokeOutcome::WindowOpened { window_id })
            }
        }
    }

    /// Fetch or lazily create the action's persistent state.
    fn state_for(&self, action: &Action) -> Option<Arc<dyn PersistentActionState>> {
        let factory = action.persistent_state.as_ref()?;
        if let Some(state) = self.ledger.lock().state(action.id) {
            return Some(state);
        }
        // The factory runs unlocked; it may call back into the host
        let created = factory(self);
        Some(self.ledger.lock().insert_state(action.id, created))
    }

    /// The persistent state of an action, if it has been created.
    pub fn persistent_state(&self, id: &str) -> Option<Arc<dyn PersistentActionState>> {
        self.ledger.lock().state(id)
    }

    // =========================================================================
    // Window
    // =========================================================================

    /// Render the open window.
    pub fn render(&self) -> Option<RenderedWindow> {
        let open = self.surface.current_window()?;
        let keyboard_shown = self.surface.keyboard_shown();
        Some(RenderedWindow {
            action_id: open.action_id.to_string(),
            title: open.window.window_name(),
            keyboard_shown,
            contents: open.window.contents(keyboard_shown),
        })
    }

    /// Route user input to the open window.
    ///
    /// Returns false if no window is open.
    pub fn dispatch_window_event(&self, event: WindowEvent) -> bool {
        match self.surface.current_window() {
            Some(open) if !open.is_closed() => {
                open.window.on_event(self, event);
                true
            }
            _ => false,
        }
    }

    /// User pressed back: dismiss the open window.
    pub fn back(&self) -> bool {
        self.close_window()
    }

    /// Action owning the open window.
    pub fn open_window_action(&self) -> Option<String> {
        self.ledger.lock().window_owner().map(str::to_string)
    }

    /// Hardware keyboards and floating panels toggle keyboard visibility.
    pub fn set_keyboard_visible(&self, visible: bool) {
        self.surface.set_keyboard_visible(visible);
    }

    fn close_window(&self) -> bool {
        let Some(open) = self.surface.take_window() else {
            return false;
        };
        // Ownership is released after close() so cleanup cannot overlap it
        let closed = open.close();
        self.ledger.lock().window_closed(open.action_id);
        closed
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Ask idle persistent states to release resources.
    ///
    /// Selection happens before this returns: states whose action has a
    /// window open (or is being invoked) are skipped, and the rest are
    /// marked as cleaning so they cannot be invoked until their cleanup
    /// finishes. Each cleanup is launched on the lifecycle scope right away
    /// and releases its mark when it ends, whether or not the returned
    /// future is awaited. Failures are logged and recorded as notices,
    /// never propagated.
    pub fn request_cleanup(&self) -> impl Future<Output = CleanupReport> + Send + 'static {
        let (selected, skipped) = self.ledger.lock().select_for_cleanup();
        let timeout = self.context.config().actions.cleanup_timeout();
        tracing::info!(
            "Cleanup requested: {} states selected, {} in use",
            selected.len(),
            skipped.len()
        );

        let (ids, tasks): (Vec<_>, Vec<_>) = selected
            .into_iter()
            .map(|(id, state)| {
                let guard = CleanupGuard {
                    ledger: self.ledger.clone(),
                    id,
                };
                let notices = self.notices.clone();
                let task = self.scope.spawn(async move {
                    let _guard = guard;
                    let result = match tokio::time::timeout(timeout, state.clean_up()).await {
                        Ok(result) => result,
                        Err(_) => Err(ActionError::Timeout { duration: timeout }),
                    };
                    match &result {
                        Ok(()) => tracing::debug!("Cleaned up state of action '{}'", id),
                        Err(e) => {
                            tracing::warn!("Cleanup of action '{}' failed: {}", id, e);
                            notices.push(HostNotice::CleanupFailure {
                                action: id.to_string(),
                                message: e.to_string(),
                            });
                        }
                    }
                    result
                });
                (id, task)
            })
            .unzip();

        async move {
            let mut report = CleanupReport {
                skipped: skipped.iter().map(|id| id.to_string()).collect(),
                ..CleanupReport::default()
            };

            for (id, joined) in ids.into_iter().zip(join_all(tasks).await) {
                let result = match joined {
                    Ok(Some(result)) => result,
                    Ok(None) => Err(ActionError::ScopeClosed),
                    Err(e) => Err(ActionError::TaskFailed(e.to_string())),
                };
                match result {
                    Ok(()) => report.cleaned.push(id.to_string()),
                    Err(e) => report.failed.push((id.to_string(), e.to_string())),
                }
            }
            report
        }
    }

    /// End the session.
    ///
    /// Closes the window, cancels any live transaction, cancels background
    /// work and drops every persistent state.
    pub fn shutdown(&self) {
        self.close_window();
        self.input.lock().supersede_live("session end");
        self.scope.cancel();
        let states = self.ledger.lock().clear();
        tracing::info!("Keyboard session ended, released {} states", states.len());
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Committed text of the field.
    pub fn text(&self) -> String {
        self.input.lock().buffer().text().to_string()
    }

    /// Text as displayed, including any partial preview.
    pub fn display_text(&self) -> String {
        self.input.lock().buffer().display_text()
    }

    pub fn composing(&self) -> Option<String> {
        self.input.lock().buffer().composing().map(str::to_string)
    }

    pub fn cursor(&self) -> usize {
        self.input.lock().buffer().cursor()
    }

    pub fn forwarded_keys(&self) -> Vec<ForwardedKey> {
        self.input.lock().buffer().forwarded_keys()
    }

    pub fn has_live_transaction(&self) -> bool {
        self.input.lock().has_live()
    }

    pub fn theme(&self) -> ThemeOption {
        self.surface.theme()
    }

    pub fn surface_state(&self) -> SurfaceState {
        self.surface.get_state()
    }

    /// Subscribe to surface changes.
    pub fn subscribe(&self) -> watch::Receiver<SurfaceState> {
        self.surface.subscribe()
    }

    /// Notices recorded so far.
    pub fn notices(&self) -> Vec<HostNotice> {
        self.notices.snapshot()
    }

    /// Drain recorded notices.
    pub fn take_notices(&self) -> Vec<HostNotice> {
        self.notices.drain()
    }

    fn edit<R>(&self, reason: &str, f: impl FnOnce(&mut InputBuffer) -> R) -> R {
        let mut input = self.input.lock();
        input.supersede_live(reason);
        f(&mut input.buffer)
    }
}

impl KeyboardManagerForAction for KeyboardHost {
    fn context(&self) -> &KeyboardContext {
        &self.context
    }

    fn lifecycle_scope(&self) -> &LifecycleScope {
        &self.scope
    }

    fn trigger_content_update(&self) {
        let generation = self.surface.bump_generation();
        tracing::debug!("Content update requested (generation {})", generation);
    }

    fn create_input_transaction(
        &self,
        apply_space_if_needed: bool,
    ) -> Box<dyn ActionInputTransaction> {
        Box::new(BufferTransaction::begin(
            self.input.clone(),
            self.notices.clone(),
            apply_space_if_needed,
        ))
    }

    fn type_text(&self, text: &str) {
        self.edit("type_text", |buffer| buffer.insert(text));
    }

    fn backspace(&self, amount: usize) {
        self.edit("backspace", |buffer| {
            buffer.delete_before(amount);
        });
    }

    fn close_action_window(&self) {
        self.close_window();
    }

    fn trigger_system_voice_input(&self) {
        if let Err(e) = self.platform.launch_system_voice_input() {
            tracing::warn!("System voice input failed: {}", e);
            self.notices.push(HostNotice::PlatformFailure {
                message: e.to_string(),
            });
        }
    }

    fn update_theme(&self, theme: ThemeOption) {
        tracing::info!("Theme changed to {}", theme.key);
        self.surface.set_theme(theme);
    }

    fn send_code_point_event(&self, code_point: i32) {
        match code_point {
            code::DELETE => self.backspace(1),
            code::SHIFT => {}
            cp => match u32::try_from(cp).ok().and_then(char::from_u32) {
                Some(c) => {
                    let mut utf8 = [0u8; 4];
                    self.type_text(c.encode_utf8(&mut utf8));
                }
                None => tracing::debug!("Ignoring unknown code point {}", cp),
            },
        }
    }

    fn send_key_event(&self, key_code: i32, meta_state: MetaState) {
        // Only keys that change the buffer end a live transaction
        if !meta_state.is_empty() {
            self.input.lock().buffer.forward_key(key_code, meta_state);
            return;
        }
        match key_code {
            keycode::DPAD_LEFT => self.edit("cursor move", |buffer| {
                buffer.move_left();
            }),
            keycode::DPAD_RIGHT => self.edit("cursor move", |buffer| {
                buffer.move_right();
            }),
            keycode::DEL => self.edit("key event", |buffer| {
                buffer.delete_before(1);
            }),
            keycode::FORWARD_DEL => self.edit("key event", |buffer| {
                buffer.delete_after(1);
            }),
            keycode::MOVE_HOME => self.edit("cursor move", InputBuffer::move_home),
            keycode::MOVE_END => self.edit("cursor move", InputBuffer::move_end),
            keycode::ENTER => self.edit("key event", |buffer| buffer.insert("\n")),
            other => self.input.lock().buffer.forward_key(other, meta_state),
        }
    }
}

impl Drop for KeyboardHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Clears the opening mark if the factory panics or returns early.
struct OpeningGuard<'a> {
    ledger: &'a Mutex<StateLedger>,
    id: &'static str,
    armed: bool,
}

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.ledger.lock().abort_open(self.id);
        }
    }
}

/// Unpins the action's state once its simple press returns.
struct PressGuard<'a> {
    ledger: &'a Mutex<StateLedger>,
    id: &'static str,
}

impl Drop for PressGuard<'_> {
    fn drop(&mut self) {
        self.ledger.lock().finish_press(self.id);
    }
}

/// Returns a cleaning state to idle when its cleanup task ends or is dropped.
struct CleanupGuard {
    ledger: Arc<Mutex<StateLedger>>,
    id: &'static str,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.ledger.lock().finish_cleanup(self.id);
    }
}

// =============================================================================
// Results
// =============================================================================

/// One render of the open window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedWindow {
    pub action_id: String,
    pub title: String,
    pub keyboard_shown: bool,
    pub contents: WindowContents,
}

/// Outcome of a cleanup request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Actions whose state cleaned up successfully.
    pub cleaned: Vec<String>,
    /// Actions skipped because they were in use.
    pub skipped: Vec<String>,
    /// Actions whose cleanup failed, with the error.
    pub failed: Vec<(String, String)>,
}

#[cfg(test)]
mod tests;
