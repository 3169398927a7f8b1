//! Action descriptors.
//!
//! An [`Action`] binds an icon and a label to a window factory, a one-shot
//! simple-press handler, or both, plus an optional persistent-state
//! factory. Descriptors are immutable; the host decides how a press maps to
//! a handler via [`Action::resolve`].

use std::sync::Arc;

use keyact_core::PrefKey;

use crate::host::KeyboardManagerForAction;
use crate::state::PersistentActionState;
use crate::window::ActionWindow;

/// Produces the window shown when the action opens.
pub type WindowFn = Arc<
    dyn Fn(&dyn KeyboardManagerForAction, Option<&dyn PersistentActionState>) -> Box<dyn ActionWindow>
        + Send
        + Sync,
>;

/// Immediate one-shot effect of a press.
pub type SimplePressFn =
    Arc<dyn Fn(&dyn KeyboardManagerForAction, Option<&dyn PersistentActionState>) + Send + Sync>;

/// Creates the action's persistent state on first use.
pub type StateFactory =
    Arc<dyn Fn(&dyn KeyboardManagerForAction) -> Arc<dyn PersistentActionState> + Send + Sync>;

/// Which handlers an action declares.
#[derive(Clone, Default)]
pub enum ActionBehavior {
    /// Nothing to run; presses are ignored.
    #[default]
    NoOp,
    SimpleOnly(SimplePressFn),
    WindowOnly(WindowFn),
    Both {
        window: WindowFn,
        simple_press: SimplePressFn,
    },
}

impl ActionBehavior {
    fn window(&self) -> Option<&WindowFn> {
        match self {
            ActionBehavior::WindowOnly(w) | ActionBehavior::Both { window: w, .. } => Some(w),
            _ => None,
        }
    }

    fn simple_press(&self) -> Option<&SimplePressFn> {
        match self {
            ActionBehavior::SimpleOnly(s) | ActionBehavior::Both { simple_press: s, .. } => {
                Some(s)
            }
            _ => None,
        }
    }
}

/// How the user pressed the action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PressGesture {
    /// Ordinary tap: opens the window if there is one.
    #[default]
    Default,
    /// Prefer the one-shot handler.
    SimplePress,
    /// Prefer the window.
    OpenWindow,
}

/// The handler a press resolved to.
pub enum Resolved<'a> {
    SimplePress(&'a SimplePressFn),
    Window(&'a WindowFn),
    NoOp,
}

/// What an invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The simple-press handler ran.
    SimplePress,
    /// A window was opened.
    WindowOpened { window_id: String },
    /// The action declares no handlers.
    NoOp,
}

/// Immutable registration record for an action.
#[derive(Clone)]
pub struct Action {
    /// Registry key.
    pub id: &'static str,
    /// Icon resource reference.
    pub icon: &'static str,
    /// Label resource reference.
    pub name: &'static str,
    /// Whether the keyboard stays usable while the window is open.
    pub can_show_keyboard: bool,
    /// Preference flag that must be on for the action to be offered.
    pub requires_pref: Option<PrefKey>,
    pub behavior: ActionBehavior,
    pub persistent_state: Option<StateFactory>,
}

impl Action {
    /// Create an action with no handlers.
    pub fn new(id: &'static str, icon: &'static str, name: &'static str) -> Self {
        Self {
            id,
            icon,
            name,
            can_show_keyboard: false,
            requires_pref: None,
            behavior: ActionBehavior::NoOp,
            persistent_state: None,
        }
    }

    /// Declare the window factory.
    pub fn with_window<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn KeyboardManagerForAction, Option<&dyn PersistentActionState>) -> Box<dyn ActionWindow>
            + Send
            + Sync
            + 'static,
    {
        let window: WindowFn = Arc::new(f);
        self.behavior = match self.behavior {
            ActionBehavior::SimpleOnly(simple_press) | ActionBehavior::Both { simple_press, .. } => {
                ActionBehavior::Both {
                    window,
                    simple_press,
                }
            }
            ActionBehavior::NoOp | ActionBehavior::WindowOnly(_) => {
                ActionBehavior::WindowOnly(window)
            }
        };
        self
    }

    /// Declare the simple-press handler.
    pub fn with_simple_press<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn KeyboardManagerForAction, Option<&dyn PersistentActionState>)
            + Send
            + Sync
            + 'static,
    {
        let simple_press: SimplePressFn = Arc::new(f);
        self.behavior = match self.behavior {
            ActionBehavior::WindowOnly(window) | ActionBehavior::Both { window, .. } => {
                ActionBehavior::Both {
                    window,
                    simple_press,
                }
            }
            ActionBehavior::NoOp | ActionBehavior::SimpleOnly(_) => {
                ActionBehavior::SimpleOnly(simple_press)
            }
        };
        self
    }

    /// Declare the persistent-state factory.
    pub fn with_persistent_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn KeyboardManagerForAction) -> Arc<dyn PersistentActionState>
            + Send
            + Sync
            + 'static,
    {
        self.persistent_state = Some(Arc::new(f));
        self
    }

    pub fn can_show_keyboard(mut self, value: bool) -> Self {
        self.can_show_keyboard = value;
        self
    }

    pub fn requires_pref(mut self, key: PrefKey) -> Self {
        self.requires_pref = Some(key);
        self
    }

    pub fn has_window(&self) -> bool {
        self.behavior.window().is_some()
    }

    pub fn has_simple_press(&self) -> bool {
        self.behavior.simple_press().is_some()
    }

    /// Pick the handler for a press.
    ///
    /// An explicit gesture uses its own handler when declared and falls back
    /// to the other one; `Default` prefers the window.
    pub fn resolve(&self, gesture: PressGesture) -> Resolved<'_> {
        let window = self.behavior.window().map(Resolved::Window);
        let simple = self.behavior.simple_press().map(Resolved::SimplePress);

        let picked = match gesture {
            PressGesture::SimplePress => simple.or(window),
            PressGesture::Default | PressGesture::OpenWindow => window.or(simple),
        };
        picked.unwrap_or(Resolved::NoOp)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("icon", &self.icon)
            .field("name", &self.name)
            .field("can_show_keyboard", &self.can_show_keyboard)
            .field("has_window", &self.has_window())
            .field("has_simple_press", &self.has_simple_press())
            .field("has_persistent_state", &self.persistent_state.is_some())
            .finish()
    }
}
