//! Action Registry
//!
//! Stores action descriptors in registration order.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use keyact_core::{ActionError, KeyboardConfig, Preferences};

use crate::action::Action;

#[derive(Default)]
struct Inner {
    actions: HashMap<&'static str, Arc<Action>>,
    order: Vec<&'static str>,
}

/// Registry of every action the keyboard knows about.
#[derive(Default)]
pub struct ActionRegistry {
    inner: RwLock<Inner>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Ids must be unique.
    pub fn register(&self, action: Action) -> Result<(), ActionError> {
        let mut inner = self.inner.write();
        if inner.actions.contains_key(action.id) {
            return Err(ActionError::DuplicateAction(action.id.to_string()));
        }
        let id = action.id;
        inner.actions.insert(id, Arc::new(action));
        inner.order.push(id);
        tracing::debug!("Registered action: {}", id);
        Ok(())
    }

    /// Look up an action by id.
    pub fn get(&self, id: &str) -> Option<Arc<Action>> {
        self.inner.read().actions.get(id).cloned()
    }

    /// All actions, in registration order.
    pub fn list(&self) -> Vec<Arc<Action>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.actions.get(id).cloned())
            .collect()
    }

    /// Actions whose required preference flag is on.
    pub fn available(&self, prefs: &dyn Preferences) -> Vec<Arc<Action>> {
        self.list()
            .into_iter()
            .filter(|a| a.requires_pref.map_or(true, |key| key.read(prefs)))
            .collect()
    }

    /// Available actions pinned in the configured favorites, in that order.
    pub fn favorites(&self, config: &KeyboardConfig, prefs: &dyn Preferences) -> Vec<Arc<Action>> {
        let available = self.available(prefs);
        config
            .actions
            .favorites
            .iter()
            .filter_map(|id| available.iter().find(|a| a.id == id.as_str()).cloned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.inner.read().order.len()
    }
}
