//! Text editing panel: cursor movement, selection and clipboard shortcuts.
//!
//! The keyboard stays visible underneath so the user can keep typing.

use keyact_api::{
    keycode, Action, ActionWindow, Element, KeyboardManagerForAction, MetaState, WindowContents,
    WindowEvent,
};

use super::ids;

/// What a panel button sends.
enum EditKey {
    Key(i32, MetaState),
    Backspace,
}

/// Panel layout: rows of (button id, label, effect).
const ROWS: &[&[(&str, &str, EditKey)]] = &[
    &[
        ("left", "Left", EditKey::Key(keycode::DPAD_LEFT, MetaState::empty())),
        ("right", "Right", EditKey::Key(keycode::DPAD_RIGHT, MetaState::empty())),
        ("home", "Home", EditKey::Key(keycode::MOVE_HOME, MetaState::empty())),
        ("end", "End", EditKey::Key(keycode::MOVE_END, MetaState::empty())),
    ],
    &[
        ("select_left", "Select Left", EditKey::Key(keycode::DPAD_LEFT, MetaState::SHIFT_ON)),
        ("select_right", "Select Right", EditKey::Key(keycode::DPAD_RIGHT, MetaState::SHIFT_ON)),
        ("select_all", "Select All", EditKey::Key(keycode::A, MetaState::CTRL_ON)),
    ],
    &[
        ("cut", "Cut", EditKey::Key(keycode::X, MetaState::CTRL_ON)),
        ("copy", "Copy", EditKey::Key(keycode::C, MetaState::CTRL_ON)),
        ("paste", "Paste", EditKey::Key(keycode::V, MetaState::CTRL_ON)),
    ],
    &[
        ("backspace", "Backspace", EditKey::Backspace),
        ("delete", "Delete", EditKey::Key(keycode::FORWARD_DEL, MetaState::empty())),
    ],
];

struct TextEditWindow;

impl ActionWindow for TextEditWindow {
    fn window_name(&self) -> String {
        "Text Editing".to_string()
    }

    fn contents(&self, keyboard_shown: bool) -> WindowContents {
        let rows = if keyboard_shown { &ROWS[..1] } else { ROWS };
        rows.iter().fold(WindowContents::new(), |contents, row| {
            contents.with(Element::row(
                row.iter()
                    .map(|(id, label, _)| Element::button(*id, *label))
                    .collect(),
            ))
        })
    }

    fn on_event(&self, host: &dyn KeyboardManagerForAction, event: WindowEvent) {
        let WindowEvent::Click(id) = event else {
            return;
        };
        let effect = ROWS
            .iter()
            .flat_map(|row| row.iter())
            .find(|(button, _, _)| *button == id)
            .map(|(_, _, effect)| effect);

        match effect {
            Some(EditKey::Key(key_code, meta)) => host.send_key_event(*key_code, *meta),
            Some(EditKey::Backspace) => host.backspace(1),
            None => tracing::debug!("Text editing ignores click on {}", id),
        }
    }

    fn close(&self) {}
}

pub fn action() -> Action {
    Action::new(ids::TEXT_EDIT, "text_select", "Text Editing")
        .can_show_keyboard(true)
        .with_window(|_host, _state| Box::new(TextEditWindow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyact_api::{ActionRegistry, KeyboardContext, KeyboardHost, LifecycleScope, PressGesture};
    use std::sync::Arc;

    fn host(text: &str) -> KeyboardHost {
        let registry = Arc::new(ActionRegistry::new());
        registry.register(action()).unwrap();
        KeyboardHost::new(
            KeyboardContext::default(),
            LifecycleScope::current().unwrap(),
            registry,
        )
        .with_text(text)
    }

    fn click(host: &KeyboardHost, id: &str) {
        assert!(host.dispatch_window_event(WindowEvent::Click(id.to_string())));
    }

    #[tokio::test]
    async fn test_cursor_and_deletion() {
        let host = host("héllo");
        host.invoke(ids::TEXT_EDIT, PressGesture::Default).unwrap();

        click(&host, "home");
        click(&host, "right");
        click(&host, "right");
        click(&host, "backspace");
        assert_eq!(host.text(), "hllo");

        click(&host, "delete");
        assert_eq!(host.text(), "hlo");
        click(&host, "end");
        assert_eq!(host.cursor(), 3);
    }

    #[tokio::test]
    async fn test_shortcuts_forwarded() {
        let host = host("text");
        host.invoke(ids::TEXT_EDIT, PressGesture::Default).unwrap();

        click(&host, "select_all");
        click(&host, "copy");
        click(&host, "select_left");

        let keys: Vec<_> = host
            .forwarded_keys()
            .iter()
            .map(|k| (k.key_code, k.meta_state))
            .collect();
        assert_eq!(
            keys,
            vec![
                (keycode::A, MetaState::CTRL_ON),
                (keycode::C, MetaState::CTRL_ON),
                (keycode::DPAD_LEFT, MetaState::SHIFT_ON),
            ]
        );
    }

    #[tokio::test]
    async fn test_layout_follows_keyboard_visibility() {
        let host = host("");
        host.invoke(ids::TEXT_EDIT, PressGesture::Default).unwrap();

        let rendered = host.render().unwrap();
        assert!(rendered.keyboard_shown);
        insta::assert_snapshot!(rendered.contents.outline(), @"[Left](left) [Right](right) [Home](home) [End](end)");

        host.set_keyboard_visible(false);
        let rendered = host.render().unwrap();
        assert!(!rendered.keyboard_shown);
        assert_eq!(rendered.contents.button_ids().len(), 12);
    }
}
