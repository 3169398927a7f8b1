//! Key codes and meta-state flags for raw input-event injection.
//!
//! Key codes follow the platform key-event numbering; code points use the
//! keyboard's own special codes for non-character keys.

use bitflags::bitflags;

/// Platform key codes.
pub mod keycode {
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const A: i32 = 29;
    pub const C: i32 = 31;
    pub const V: i32 = 50;
    pub const X: i32 = 52;
    pub const Y: i32 = 53;
    pub const Z: i32 = 54;
    pub const ENTER: i32 = 66;
    pub const DEL: i32 = 67;
    pub const FORWARD_DEL: i32 = 112;
    pub const MOVE_HOME: i32 = 122;
    pub const MOVE_END: i32 = 123;
}

/// Special code points sent through `send_code_point_event`.
pub mod code {
    /// Delete the character before the cursor.
    pub const DELETE: i32 = -4;
    /// Shift key; has no effect on the text field.
    pub const SHIFT: i32 = -1;
    pub const ENTER: i32 = '\n' as i32;
    pub const SPACE: i32 = ' ' as i32;
}

bitflags! {
    /// Modifier state attached to a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MetaState: i32 {
        const SHIFT_ON = 0x1;
        const ALT_ON = 0x2;
        const CTRL_ON = 0x1000;
        const META_ON = 0x10000;
    }
}
