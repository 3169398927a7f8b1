//! Lifecycle scope for action background work.
//!
//! Actions and their persistent state launch background work (model
//! loading, network calls) on a [`LifecycleScope`] so the UI thread that
//! invokes them never blocks. The scope is cancelled when the keyboard
//! session ends; in-flight tasks observe that through [`LifecycleScope::token`].
//!
//! Hosts without an ambient tokio runtime own a [`ScopeRuntime`], which
//! keeps a dedicated multi-threaded runtime alive for the session.

use std::future::Future;
use std::time::Duration;

use keyact_core::ActionError;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// =============================================================================
// LifecycleScope
// =============================================================================

/// A cancellable scheduling scope tied to the keyboard session.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct LifecycleScope {
    handle: Handle,
    token: CancellationToken,
}

impl LifecycleScope {
    /// Create a scope that spawns onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            token: CancellationToken::new(),
        }
    }

    /// Create a scope on the runtime of the calling context.
    pub fn current() -> Result<Self, ActionError> {
        let handle =
            Handle::try_current().map_err(|e| ActionError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self::new(handle))
    }

    /// A child scope, cancelled with this one or on its own.
    pub fn child(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            token: self.token.child_token(),
        }
    }

    /// Launch background work.
    ///
    /// Resolves to `None` if the scope is cancelled before the work finishes.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => None,
                out = fut => Some(out),
            }
        })
    }

    /// Run work on the scope and await it with a timeout.
    ///
    /// The task is aborted if the timeout expires.
    pub async fn run_with_timeout<F>(&self, timeout: Duration, fut: F) -> Result<F::Output, ActionError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut task = self.spawn(fut);
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Some(out))) => Ok(out),
            Ok(Ok(None)) => Err(ActionError::ScopeClosed),
            Ok(Err(e)) => Err(ActionError::TaskFailed(e.to_string())),
            Err(_) => {
                task.abort();
                Err(ActionError::Timeout { duration: timeout })
            }
        }
    }

    /// Token for observing cancellation inside long-running work.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel all work launched on this scope and its children.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Lifecycle scope cancelled");
        }
        self.token.cancel();
    }

    /// The runtime handle backing this scope.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

// =============================================================================
// ScopeRuntime
// =============================================================================

/// A dedicated runtime for hosts whose UI thread is not async.
///
/// The UI thread keeps issuing synchronous calls; background work runs on
/// the runtime's worker threads.
pub struct ScopeRuntime {
    runtime: Option<Runtime>,
    scope: LifecycleScope,
}

impl ScopeRuntime {
    /// Start a runtime with the given number of worker threads.
    pub fn start(worker_threads: usize) -> Result<Self, ActionError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("keyact-scope")
            .enable_all()
            .build()
            .map_err(|e| ActionError::RuntimeUnavailable(e.to_string()))?;
        let scope = LifecycleScope::new(runtime.handle().clone());
        tracing::info!("Scope runtime started with {} workers", worker_threads.max(1));

        Ok(Self {
            runtime: Some(runtime),
            scope,
        })
    }

    /// The session-wide lifecycle scope.
    pub fn scope(&self) -> &LifecycleScope {
        &self.scope
    }

    /// Drive a future to completion from the synchronous side.
    pub fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, ActionError> {
        match &self.runtime {
            Some(runtime) => Ok(runtime.block_on(fut)),
            None => Err(ActionError::ScopeClosed),
        }
    }

    /// Cancel the scope and stop the runtime without waiting for tasks.
    pub fn shutdown(&mut self) {
        self.scope.cancel();
        if let Some(runtime) = self.runtime.take() {
            tracing::info!("Scope runtime shutting down");
            runtime.shutdown_background();
        }
    }
}

impl Drop for ScopeRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
