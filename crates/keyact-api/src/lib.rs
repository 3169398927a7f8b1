//! Action API for the Keyact keyboard.
//!
//! This crate provides the contract between the keyboard and its actions:
//! - `Action` descriptors and the `ActionRegistry`
//! - `KeyboardManagerForAction`, the host facade every action receives
//! - `ActionWindow` takeover surfaces with an idempotent close contract
//! - `PersistentActionState` with host-driven cleanup
//! - `ActionInputTransaction` staging of partial and committed text
//! - `KeyboardHost`, the reference host enforcing the lifecycle rules

pub mod action;
pub mod buffer;
pub mod engine;
pub mod host;
pub mod registry;
pub mod state;
pub mod transaction;
pub mod window;

// Re-export commonly used types
pub use action::{
    Action, ActionBehavior, InvokeOutcome, PressGesture, SimplePressFn, StateFactory, WindowFn,
};
pub use buffer::{ForwardedKey, InputBuffer, MAX_FORWARDED_KEYS};
pub use engine::{CleanupReport, KeyboardHost, RenderedWindow, SurfaceState, WindowState};
pub use host::{
    HostNotice, KeyboardContext, KeyboardManagerForAction, NoPlatform, PlatformBridge, MAX_NOTICES,
};
pub use registry::ActionRegistry;
pub use state::PersistentActionState;
pub use transaction::ActionInputTransaction;
pub use window::{ActionWindow, Element, WindowContents, WindowEvent};

// Re-export keyact_core types for convenience
pub use keyact_core::{
    code, keycode, ActionError, KeyboardConfig, MetaState, PlatformError, Preferences,
    ThemeOption, TransactionError,
};
pub use keyact_runtime::LifecycleScope;
