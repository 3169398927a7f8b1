//! Observable keyboard surface with automatic change notifications.
//!
//! The surface is the open action window (at most one), the active theme,
//! keyboard visibility and a content generation counter. Every method that
//! changes it also broadcasts the new state.

use std::sync::Arc;

use keyact_core::ThemeOption;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use crate::window::OpenWindow;

/// Snapshot of the open window for subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowState {
    pub window_id: String,
    pub action_id: String,
    pub can_show_keyboard: bool,
}

/// Snapshot of the surface for subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceState {
    pub window: Option<WindowState>,
    pub theme: String,
    /// Whether the keyboard itself would be drawn (hardware keyboards hide it).
    pub keyboard_visible: bool,
    /// Whether the keyboard is shown under the current window, if any.
    pub keyboard_shown: bool,
    pub content_generation: u64,
}

struct Inner {
    window: Option<Arc<OpenWindow>>,
    theme: ThemeOption,
    keyboard_visible: bool,
    generation: u64,
}

/// A surface that automatically broadcasts changes.
///
/// Uses `parking_lot::RwLock` for the state (never poisons) and
/// `tokio::sync::watch` for broadcasts.
pub struct ObservableSurface {
    inner: RwLock<Inner>,
    tx: watch::Sender<SurfaceState>,
    rx: watch::Receiver<SurfaceState>,
}

impl ObservableSurface {
    pub fn new(theme: ThemeOption) -> Self {
        let inner = Inner {
            window: None,
            theme,
            keyboard_visible: true,
            generation: 0,
        };
        let (tx, rx) = watch::channel(Self::snapshot(&inner));
        Self {
            inner: RwLock::new(inner),
            tx,
            rx,
        }
    }

    // =========================================================================
    // Mutation Methods (all broadcast automatically)
    // =========================================================================

    /// Present a window, returning the one it replaced.
    pub fn open(&self, window: Arc<OpenWindow>) -> Option<Arc<OpenWindow>> {
        self.mutate(|inner| {
            tracing::debug!("Presenting window of action '{}'", window.action_id);
            inner.window.replace(window)
        })
    }

    /// Remove the open window.
    ///
    /// Broadcasts only if there was one.
    pub fn take_window(&self) -> Option<Arc<OpenWindow>> {
        let (old, state) = {
            let mut inner = self.inner.write();
            let old = inner.window.take();
            (old, Self::snapshot(&inner))
        };
        if old.is_some() {
            let _ = self.tx.send(state);
        }
        old
    }

    pub fn set_theme(&self, theme: ThemeOption) {
        self.mutate(|inner| inner.theme = theme);
    }

    pub fn set_keyboard_visible(&self, visible: bool) {
        self.mutate(|inner| inner.keyboard_visible = visible);
    }

    /// Bump the content generation so renderers redraw.
    pub fn bump_generation(&self) -> u64 {
        self.mutate(|inner| {
            inner.generation += 1;
            inner.generation
        })
    }

    // =========================================================================
    // Read Methods
    // =========================================================================

    pub fn current_window(&self) -> Option<Arc<OpenWindow>> {
        self.inner.read().window.clone()
    }

    pub fn theme(&self) -> ThemeOption {
        self.inner.read().theme
    }

    /// Whether the keyboard is drawn under the current window.
    pub fn keyboard_shown(&self) -> bool {
        Self::keyboard_shown_for(&self.inner.read())
    }

    pub fn get_state(&self) -> SurfaceState {
        Self::snapshot(&self.inner.read())
    }

    /// Subscribe to surface changes.
    pub fn subscribe(&self) -> watch::Receiver<SurfaceState> {
        self.rx.clone()
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn mutate<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let (result, state) = {
            let mut inner = self.inner.write();
            let result = f(&mut inner);
            (result, Self::snapshot(&inner))
        };
        let _ = self.tx.send(state);
        result
    }

    fn keyboard_shown_for(inner: &Inner) -> bool {
        inner.keyboard_visible
            && inner
                .window
                .as_ref()
                .map_or(true, |w| w.can_show_keyboard)
    }

    fn snapshot(inner: &Inner) -> SurfaceState {
        SurfaceState {
            window: inner.window.as_ref().map(|w| WindowState {
                window_id: w.id.clone(),
                action_id: w.action_id.to_string(),
                can_show_keyboard: w.can_show_keyboard,
            }),
            theme: inner.theme.key.to_string(),
            keyboard_visible: inner.keyboard_visible,
            keyboard_shown: Self::keyboard_shown_for(inner),
            content_generation: inner.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{ActionWindow, WindowContents};
    use keyact_core::THEMES;

    struct Blank;

    impl ActionWindow for Blank {
        fn window_name(&self) -> String {
            "Blank".to_string()
        }

        fn contents(&self, _keyboard_shown: bool) -> WindowContents {
            WindowContents::new()
        }

        fn close(&self) {}
    }

    fn open_window(action_id: &'static str, can_show_keyboard: bool) -> Arc<OpenWindow> {
        Arc::new(OpenWindow::new(action_id, can_show_keyboard, Arc::new(Blank)))
    }

    #[test]
    fn test_open_broadcasts() {
        let surface = ObservableSurface::new(THEMES[0]);
        let rx = surface.subscribe();
        assert!(rx.borrow().window.is_none());

        surface.open(open_window("clipboard", false));
        let state = rx.borrow().clone();
        assert_eq!(state.window.unwrap().action_id, "clipboard");
        assert!(!state.keyboard_shown);
        assert!(state.keyboard_visible);
    }

    #[test]
    fn test_replace_returns_previous() {
        let surface = ObservableSurface::new(THEMES[0]);
        assert!(surface.open(open_window("a", false)).is_none());
        let old = surface.open(open_window("b", true)).unwrap();
        assert_eq!(old.action_id, "a");
        assert!(surface.keyboard_shown());
    }

    #[test]
    fn test_take_window() {
        let surface = ObservableSurface::new(THEMES[0]);
        let rx = surface.subscribe();

        assert!(surface.take_window().is_none());
        surface.open(open_window("a", false));
        assert!(surface.take_window().is_some());
        assert!(rx.borrow().window.is_none());
        assert!(rx.borrow().keyboard_shown);
    }

    #[test]
    fn test_keyboard_hidden_by_hardware_keyboard() {
        let surface = ObservableSurface::new(THEMES[0]);
        surface.open(open_window("text_edit", true));
        assert!(surface.keyboard_shown());

        surface.set_keyboard_visible(false);
        assert!(!surface.get_state().keyboard_shown);
    }

    #[test]
    fn test_generation_and_theme() {
        let surface = ObservableSurface::new(THEMES[0]);
        let rx = surface.subscribe();

        assert_eq!(surface.bump_generation(), 1);
        assert_eq!(surface.bump_generation(), 2);
        surface.set_theme(THEMES[2]);

        assert_eq!(rx.borrow().content_generation, 2);
        assert_eq!(rx.borrow().theme, THEMES[2].key);
    }
}
