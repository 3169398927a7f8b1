//! Long-lived state an action keeps across invocations.

use std::any::Any;

use async_trait::async_trait;
use keyact_core::ActionError;

/// State owned by the host's registry on behalf of one action.
///
/// The host creates it lazily from the action's factory and keeps the same
/// object for the whole session. Under memory pressure the host calls
/// [`clean_up`](Self::clean_up), never while the action's window is open;
/// the object stays registered afterwards and must behave as freshly reset.
#[async_trait]
pub trait PersistentActionState: Any + Send + Sync {
    /// Release caches, close files, stop outstanding work.
    ///
    /// Must be idempotent. Having nothing to release is success.
    async fn clean_up(&self) -> Result<(), ActionError>;

    /// Support downcasting to the action's concrete state type.
    fn as_any(&self) -> &dyn Any;
}

impl dyn PersistentActionState {
    /// Downcast to the concrete state type.
    pub fn downcast_ref<T: PersistentActionState>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
