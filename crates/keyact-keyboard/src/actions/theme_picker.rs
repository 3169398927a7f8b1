//! Theme picker action.

use parking_lot::Mutex;

use keyact_api::{
    Action, ActionWindow, Element, KeyboardManagerForAction, ThemeOption, WindowContents,
    WindowEvent,
};
use keyact_core::THEMES;

use super::ids;

struct ThemeWindow {
    selected: Mutex<String>,
}

impl ActionWindow for ThemeWindow {
    fn window_name(&self) -> String {
        "Theme".to_string()
    }

    fn contents(&self, _keyboard_shown: bool) -> WindowContents {
        let selected = self.selected.lock();
        THEMES.iter().fold(WindowContents::new(), |contents, theme| {
            let label = if theme.key == selected.as_str() {
                format!("{} (current)", theme.name)
            } else {
                theme.name.to_string()
            };
            contents.with(Element::button(format!("theme:{}", theme.key), label))
        })
    }

    fn on_event(&self, host: &dyn KeyboardManagerForAction, event: WindowEvent) {
        let WindowEvent::Click(id) = event else {
            return;
        };
        match id.strip_prefix("theme:").and_then(ThemeOption::by_key) {
            Some(theme) => {
                *self.selected.lock() = theme.key.to_string();
                host.update_theme(theme);
            }
            None => tracing::warn!("Unknown theme button: {}", id),
        }
    }

    fn close(&self) {}
}

pub fn action() -> Action {
    Action::new(ids::THEME, "palette", "Theme").with_window(|host, _state| {
        let selected = host.context().config().appearance.theme.clone();
        Box::new(ThemeWindow {
            selected: Mutex::new(selected),
        })
    })
}
