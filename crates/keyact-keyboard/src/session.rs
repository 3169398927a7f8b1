//! Scripted keyboard session.
//!
//! Drives a [`KeyboardHost`] from line-oriented commands, standing in for
//! the touch surface and the editor:
//!
//! ```text
//! type <text>            type text into the field
//! backspace [n]          delete n graphemes (default 1)
//! press <id> [simple|window]
//! feed <text>            recognised text into the open window
//! click <id>             tap a button in the open window
//! back                   dismiss the open window
//! keyboard <shown|hidden>
//! copy <text>            copy text on the device
//! pref <key> <on|off>
//! cleanup                ask idle actions to release resources
//! show                   print the field and surface
//! render                 print the open window
//! ```

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use keyact_api::{
    ActionError, ActionRegistry, ForwardedKey, HostNotice, KeyboardConfig, KeyboardContext,
    KeyboardHost, KeyboardManagerForAction, LifecycleScope, PressGesture, Preferences,
    SurfaceState, WindowEvent,
};
use keyact_core::MemoryPreferences;

use crate::actions::{register_builtin_actions, ClipboardHistory};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("Action '{0}' is disabled in preferences")]
    ActionDisabled(String),

    #[error("No action window is open")]
    NoWindow,

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Commands
// =============================================================================

/// One script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Type(String),
    Backspace(usize),
    Press { id: String, gesture: PressGesture },
    Feed(String),
    Click(String),
    Back,
    Keyboard { shown: bool },
    Copy(String),
    Pref { key: String, value: bool },
    Cleanup,
    Show,
    Render,
}

impl Command {
    /// Parse a script line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>, SessionError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        // Text arguments are taken verbatim after the first space
        let (word, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        let mut args = rest.split_whitespace();

        let command = match word {
            "type" => Command::Type(text_arg("type", rest)?),
            "backspace" => match args.next() {
                None => Command::Backspace(1),
                Some(n) => Command::Backspace(n.parse().map_err(|_| SessionError::BadArgument {
                    command: "backspace",
                    expected: "a count",
                })?),
            },
            "press" => {
                let id = args.next().ok_or(SessionError::BadArgument {
                    command: "press",
                    expected: "an action id",
                })?;
                let gesture = match args.next() {
                    None => PressGesture::Default,
                    Some("simple") => PressGesture::SimplePress,
                    Some("window") => PressGesture::OpenWindow,
                    Some(_) => {
                        return Err(SessionError::BadArgument {
                            command: "press",
                            expected: "'simple' or 'window'",
                        })
                    }
                };
                Command::Press {
                    id: id.to_string(),
                    gesture,
                }
            }
            "feed" => Command::Feed(text_arg("feed", rest)?),
            "click" => Command::Click(text_arg("click", rest.trim())?),
            "back" => Command::Back,
            "keyboard" => match args.next() {
                Some("shown") => Command::Keyboard { shown: true },
                Some("hidden") => Command::Keyboard { shown: false },
                _ => {
                    return Err(SessionError::BadArgument {
                        command: "keyboard",
                        expected: "'shown' or 'hidden'",
                    })
                }
            },
            "copy" => Command::Copy(text_arg("copy", rest)?),
            "pref" => match (args.next(), args.next()) {
                (Some(key), Some(value @ ("on" | "off"))) => Command::Pref {
                    key: key.to_string(),
                    value: value == "on",
                },
                _ => {
                    return Err(SessionError::BadArgument {
                        command: "pref",
                        expected: "a key and 'on' or 'off'",
                    })
                }
            },
            "cleanup" => Command::Cleanup,
            "show" => Command::Show,
            "render" => Command::Render,
            other => return Err(SessionError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn text_arg(command: &'static str, rest: &str) -> Result<String, SessionError> {
    if rest.is_empty() {
        return Err(SessionError::BadArgument {
            command,
            expected: "text",
        });
    }
    Ok(rest.to_string())
}

// =============================================================================
// Session
// =============================================================================

/// Field and surface as printed by `show`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub text: String,
    pub display_text: String,
    pub cursor: usize,
    pub composing: Option<String>,
    pub surface: SurfaceState,
    pub forwarded_keys: Vec<ForwardedKey>,
    pub notices: Vec<HostNotice>,
}

/// A keyboard session with every built-in action registered.
pub struct Session {
    host: KeyboardHost,
    preferences: Arc<MemoryPreferences>,
    clipboard: Arc<ClipboardHistory>,
}

impl Session {
    pub fn new(config: KeyboardConfig, scope: LifecycleScope) -> Result<Self, ActionError> {
        let preferences = Arc::new(MemoryPreferences::new());
        let clipboard = Arc::new(ClipboardHistory::new(config.clipboard.max_items));

        let registry = Arc::new(ActionRegistry::new());
        register_builtin_actions(&registry, &config, clipboard.clone())?;

        let context = KeyboardContext::new(config, preferences.clone());
        let host = KeyboardHost::new(context, scope, registry);
        tracing::info!("Keyboard session started");

        Ok(Self {
            host,
            preferences,
            clipboard,
        })
    }

    pub fn host(&self) -> &KeyboardHost {
        &self.host
    }

    /// Run one command, returning its output if it prints any.
    pub async fn execute(&self, command: Command) -> Result<Option<Value>, SessionError> {
        match command {
            Command::Type(text) => self.host.type_text(&text),
            Command::Backspace(n) => self.host.backspace(n),
            Command::Press { id, gesture } => {
                self.ensure_enabled(&id)?;
                self.host.invoke(&id, gesture)?;
            }
            Command::Feed(text) => self.dispatch(WindowEvent::Text(text))?,
            Command::Click(id) => self.dispatch(WindowEvent::Click(id))?,
            Command::Back => {
                if !self.host.back() {
                    return Err(SessionError::NoWindow);
                }
            }
            Command::Keyboard { shown } => self.host.set_keyboard_visible(shown),
            Command::Copy(text) => self.clipboard.push(&text),
            Command::Pref { key, value } => self.preferences.set_bool(&key, value),
            Command::Cleanup => {
                let report = self.host.request_cleanup().await;
                return Ok(Some(json!({ "cleanup": report })));
            }
            Command::Show => return Ok(Some(serde_json::to_value(self.snapshot())?)),
            Command::Render => return Ok(Some(json!({ "window": self.host.render() }))),
        }
        Ok(None)
    }

    /// Run a whole script, collecting printed output.
    ///
    /// A failing line becomes an error object and the script continues.
    pub async fn run_script(&self, script: &str) -> Vec<Value> {
        let mut output = Vec::new();
        for (index, line) in script.lines().enumerate() {
            let result = match Command::parse(line) {
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => continue,
                Err(e) => Err(e),
            };
            match result {
                Ok(Some(value)) => output.push(value),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Line {}: {}", index + 1, e);
                    output.push(json!({ "line": index + 1, "error": e.to_string() }));
                }
            }
        }
        output
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            text: self.host.text(),
            display_text: self.host.display_text(),
            cursor: self.host.cursor(),
            composing: self.host.composing(),
            surface: self.host.surface_state(),
            forwarded_keys: self.host.forwarded_keys(),
            notices: self.host.notices(),
        }
    }

    pub fn shutdown(&self) {
        self.host.shutdown();
    }

    fn ensure_enabled(&self, id: &str) -> Result<(), SessionError> {
        let gate = self.host.registry().get(id).and_then(|a| a.requires_pref);
        match gate {
            Some(key) if !key.read(self.preferences.as_ref()) => {
                Err(SessionError::ActionDisabled(id.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn dispatch(&self, event: WindowEvent) -> Result<(), SessionError> {
        if self.host.dispatch_window_event(event) {
            Ok(())
        } else {
            Err(SessionError::NoWindow)
        }
    }
}
