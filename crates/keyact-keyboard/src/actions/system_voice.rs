//! Hand dictation over to the platform's own voice input.

use keyact_api::Action;
use keyact_core::pref;

use super::ids;

pub fn action() -> Action {
    Action::new(ids::SYSTEM_VOICE_INPUT, "mic_external", "System Voice Input")
        .requires_pref(pref::ENABLE_VOICE_INPUT)
        .with_simple_press(|host, _state| host.trigger_system_voice_input())
}
