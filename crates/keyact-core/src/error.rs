//! Error types for the Keyact keyboard action system.

use std::time::Duration;
use thiserror::Error;

/// Action invocation and lifecycle errors.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No action registered under this id.
    #[error("Action '{0}' not found")]
    ActionNotFound(String),

    /// An action with this id is already registered.
    #[error("Action '{0}' is already registered")]
    DuplicateAction(String),

    /// The action's persistent state is being cleaned up.
    #[error("Action '{0}' is cleaning up its persistent state")]
    CleanupInProgress(String),

    /// A window factory tried to open another window while running.
    #[error("Action '{requested}' cannot open a window while '{opening}' is opening one")]
    WindowAlreadyOpening { opening: String, requested: String },

    /// Persistent state cleanup reported a failure.
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    /// Persistent state cleanup did not finish in time.
    #[error("Cleanup timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// A background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// The lifecycle scope has been cancelled.
    #[error("Lifecycle scope closed")]
    ScopeClosed,

    /// No async runtime is available to back the lifecycle scope.
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

/// Input transaction misuse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransactionError {
    /// `commit` was already called.
    #[error("Transaction was already committed")]
    AlreadyCommitted,

    /// `cancel` was already called.
    #[error("Transaction was already cancelled")]
    AlreadyCancelled,

    /// A newer transaction or a direct edit replaced this one.
    #[error("Transaction was superseded by another edit")]
    Superseded,
}

/// Platform-call failures.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// No dictation facility is installed or enabled.
    #[error("System voice input unavailable")]
    VoiceInputUnavailable,

    /// The platform refused to launch the facility.
    #[error("Platform launch failed: {0}")]
    LaunchFailed(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory found.
    #[error("Config directory not found")]
    NoConfigDir,

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}
