//! Bookkeeping for persistent states and window ownership.
//!
//! The ledger is the single place that serializes cleanup against window
//! state: a state is only selected for cleanup while its action has no
//! window open, is not opening one and is not running a simple press, and
//! an action cannot be invoked while its state is cleaning up.

use std::collections::HashMap;
use std::sync::Arc;

use keyact_core::ActionError;

use crate::state::PersistentActionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStatus {
    Idle,
    CleaningUp,
}

struct StateSlot {
    state: Arc<dyn PersistentActionState>,
    status: SlotStatus,
}

#[derive(Default)]
pub(crate) struct StateLedger {
    slots: HashMap<&'static str, StateSlot>,
    /// Action whose window is currently open.
    window_owner: Option<&'static str>,
    /// Action whose window factory is running.
    opening: Option<&'static str>,
    /// Actions inside a simple-press handler, with nesting depth.
    pressing: HashMap<&'static str, usize>,
}

impl StateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail if the action's state is being cleaned up.
    pub fn ensure_usable(&self, id: &'static str) -> Result<(), ActionError> {
        match self.slots.get(id) {
            Some(slot) if slot.status == SlotStatus::CleaningUp => {
                Err(ActionError::CleanupInProgress(id.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn state(&self, id: &str) -> Option<Arc<dyn PersistentActionState>> {
        self.slots.get(id).map(|slot| slot.state.clone())
    }

    /// Store a freshly created state, keeping an existing one if present.
    pub fn insert_state(
        &mut self,
        id: &'static str,
        state: Arc<dyn PersistentActionState>,
    ) -> Arc<dyn PersistentActionState> {
        self.slots
            .entry(id)
            .or_insert_with(|| {
                tracing::debug!("Created persistent state for action '{}'", id);
                StateSlot {
                    state,
                    status: SlotStatus::Idle,
                }
            })
            .state
            .clone()
    }

    // =========================================================================
    // Window Ownership
    // =========================================================================

    /// Mark a window factory as running.
    pub fn begin_open(&mut self, id: &'static str) -> Result<(), ActionError> {
        if let Some(opening) = self.opening {
            return Err(ActionError::WindowAlreadyOpening {
                opening: opening.to_string(),
                requested: id.to_string(),
            });
        }
        self.ensure_usable(id)?;
        self.opening = Some(id);
        Ok(())
    }

    /// The factory returned and its window is presented.
    pub fn finish_open(&mut self, id: &'static str) {
        if self.opening == Some(id) {
            self.opening = None;
        }
        self.window_owner = Some(id);
    }

    /// The factory did not produce a window.
    pub fn abort_open(&mut self, id: &'static str) {
        if self.opening == Some(id) {
            self.opening = None;
        }
    }

    pub fn window_closed(&mut self, id: &'static str) {
        if self.window_owner == Some(id) {
            self.window_owner = None;
        }
    }

    pub fn window_owner(&self) -> Option<&'static str> {
        self.window_owner
    }

    // =========================================================================
    // Simple Press
    // =========================================================================

    pub fn begin_press(&mut self, id: &'static str) -> Result<(), ActionError> {
        self.ensure_usable(id)?;
        *self.pressing.entry(id).or_insert(0) += 1;
        Ok(())
    }

    pub fn finish_press(&mut self, id: &'static str) {
        if let Some(depth) = self.pressing.get_mut(id) {
            *depth -= 1;
            if *depth == 0 {
                self.pressing.remove(id);
            }
        }
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    fn in_use(&self, id: &'static str) -> bool {
        self.window_owner == Some(id) || self.opening == Some(id) || self.pressing.contains_key(id)
    }

    /// Select every idle state not in use and mark it as cleaning.
    ///
    /// Returns the selected states and the ids skipped because they are in use.
    pub fn select_for_cleanup(
        &mut self,
    ) -> (
        Vec<(&'static str, Arc<dyn PersistentActionState>)>,
        Vec<&'static str>,
    ) {
        let mut selected = Vec::new();
        let mut skipped = Vec::new();
        let ids: Vec<&'static str> = self.slots.keys().copied().collect();

        for id in ids {
            if self.in_use(id) {
                skipped.push(id);
                continue;
            }
            if let Some(slot) = self.slots.get_mut(id) {
                if slot.status == SlotStatus::Idle {
                    slot.status = SlotStatus::CleaningUp;
                    selected.push((id, slot.state.clone()));
                }
            }
        }
        selected.sort_by_key(|(id, _)| *id);
        skipped.sort();
        (selected, skipped)
    }

    pub fn finish_cleanup(&mut self, id: &'static str) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.status = SlotStatus::Idle;
        }
    }

    /// Drop every state, ending the session.
    pub fn clear(&mut self) -> Vec<Arc<dyn PersistentActionState>> {
        self.window_owner = None;
        self.opening = None;
        self.pressing.clear();
        self.slots.drain().map(|(_, slot)| slot.state).collect()
    }
}
