//! Undo and redo, sent to the editor as shortcut key events.

use keyact_api::{keycode, Action, MetaState};

use super::ids;

pub fn undo() -> Action {
    Action::new(ids::UNDO, "undo", "Undo").with_simple_press(|host, _state| {
        host.send_key_event(keycode::Z, MetaState::CTRL_ON);
    })
}

pub fn redo() -> Action {
    Action::new(ids::REDO, "redo", "Redo").with_simple_press(|host, _state| {
        host.send_key_event(keycode::Z, MetaState::CTRL_ON | MetaState::SHIFT_ON);
    })
}
