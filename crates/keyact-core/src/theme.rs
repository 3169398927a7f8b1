//! Theme options selectable from the keyboard.

use serde::{Deserialize, Serialize};

/// Theme mode selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// A visual theme the keyboard can switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeOption {
    /// Stable key stored in configuration.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Light/dark appearance of the theme.
    pub mode: ThemeMode,
}

impl ThemeOption {
    /// Look up a built-in theme by key.
    pub fn by_key(key: &str) -> Option<ThemeOption> {
        THEMES.iter().copied().find(|t| t.key == key)
    }
}

/// Built-in themes, in display order.
pub const THEMES: &[ThemeOption] = &[
    ThemeOption {
        key: "dynamic_system",
        name: "Dynamic System",
        mode: ThemeMode::System,
    },
    ThemeOption {
        key: "classic_dark",
        name: "Classic Dark",
        mode: ThemeMode::Dark,
    },
    ThemeOption {
        key: "classic_light",
        name: "Classic Light",
        mode: ThemeMode::Light,
    },
    ThemeOption {
        key: "high_contrast",
        name: "High Contrast",
        mode: ThemeMode::Dark,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_key() {
        let theme = ThemeOption::by_key("classic_light").unwrap();
        assert_eq!(theme.mode, ThemeMode::Light);
        assert!(ThemeOption::by_key("neon").is_none());
    }
}
