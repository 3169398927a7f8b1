//! Action windows: takeover surfaces shown in place of the keyboard.
//!
//! A window is created by its action's window factory, rendered by the host
//! as often as needed, and closed exactly once. Contents are described as a
//! small element tree so any frontend can draw them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::host::KeyboardManagerForAction;

/// A takeover surface presented by an action.
///
/// Methods take `&self`; implementations keep mutable state behind their own
/// locks and must release them before calling back into the host.
pub trait ActionWindow: Send + Sync {
    /// Title for the host's window chrome. Recomputed on every render.
    fn window_name(&self) -> String;

    /// Describe the window for one render.
    ///
    /// `keyboard_shown` is true when the normal keyboard is visible below.
    fn contents(&self, keyboard_shown: bool) -> WindowContents;

    /// Handle user input routed to the window.
    fn on_event(&self, _host: &dyn KeyboardManagerForAction, _event: WindowEvent) {}

    /// Release the window. The host calls this at most once.
    fn close(&self);
}

/// User input delivered to an open window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// A button was pressed.
    Click(String),
    /// Text was fed into the window (a typed query, a recognised phrase).
    Text(String),
}

// =============================================================================
// Contents
// =============================================================================

/// One node of a window's element tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text { text: String },
    Button { id: String, label: String },
    Row { children: Vec<Element> },
    Column { children: Vec<Element> },
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Element::Text { text: text.into() }
    }

    pub fn button(id: impl Into<String>, label: impl Into<String>) -> Self {
        Element::Button {
            id: id.into(),
            label: label.into(),
        }
    }

    pub fn row(children: Vec<Element>) -> Self {
        Element::Row { children }
    }

    pub fn column(children: Vec<Element>) -> Self {
        Element::Column { children }
    }

    fn write_outline(&self, depth: usize, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match self {
            Element::Text { text } => out.push(format!("{}{}", indent, text)),
            Element::Button { id, label } => out.push(format!("{}[{}]({})", indent, label, id)),
            Element::Row { children } => {
                let line: Vec<String> = children.iter().map(Element::inline).collect();
                out.push(format!("{}{}", indent, line.join(" ")));
            }
            Element::Column { children } => {
                for child in children {
                    child.write_outline(depth + 1, out);
                }
            }
        }
    }

    fn inline(&self) -> String {
        match self {
            Element::Text { text } => text.clone(),
            Element::Button { id, label } => format!("[{}]({})", label, id),
            Element::Row { children } | Element::Column { children } => {
                let parts: Vec<String> = children.iter().map(Element::inline).collect();
                parts.join(" ")
            }
        }
    }
}

/// Everything a window shows for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowContents {
    pub elements: Vec<Element>,
}

impl WindowContents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element.
    pub fn with(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Ids of every button, in tree order.
    pub fn button_ids(&self) -> Vec<String> {
        fn collect(el: &Element, out: &mut Vec<String>) {
            match el {
                Element::Button { id, .. } => out.push(id.clone()),
                Element::Row { children } | Element::Column { children } => {
                    children.iter().for_each(|c| collect(c, out))
                }
                Element::Text { .. } => {}
            }
        }
        let mut out = Vec::new();
        self.elements.iter().for_each(|e| collect(e, &mut out));
        out
    }

    /// Plain-text rendering, one line per element.
    pub fn outline(&self) -> String {
        let mut lines = Vec::new();
        for element in &self.elements {
            element.write_outline(0, &mut lines);
        }
        lines.join("\n")
    }
}

// =============================================================================
// Open Window
// =============================================================================

/// A window the host is presenting.
///
/// Every close path (self-dismissal, back, replacement, session end) goes
/// through [`OpenWindow::close`], which reaches the implementation once.
pub struct OpenWindow {
    pub(crate) id: String,
    pub(crate) action_id: &'static str,
    pub(crate) can_show_keyboard: bool,
    pub(crate) window: Arc<dyn ActionWindow>,
    closed: AtomicBool,
}

impl OpenWindow {
    pub(crate) fn new(
        action_id: &'static str,
        can_show_keyboard: bool,
        window: Arc<dyn ActionWindow>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action_id,
            can_show_keyboard,
            window,
            closed: AtomicBool::new(false),
        }
    }

    /// Close the window. Returns false if it was already closed.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!("Closing window {} of action '{}'", self.id, self.action_id);
        self.window.close();
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
