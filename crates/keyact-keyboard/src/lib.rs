//! Built-in actions and a scripted session for the Keyact keyboard.
//!
//! This crate provides:
//! - The built-in action families (voice input, clipboard, theme, undo/redo,
//!   system voice input, text editing)
//! - `Session`, a line-oriented driver standing in for the touch surface

pub mod actions;
pub mod session;

pub use actions::{builtin_actions, register_builtin_actions, ClipboardHistory};
pub use session::{Command, Session, SessionError, Snapshot};
