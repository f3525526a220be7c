//! Input device abstraction
//!
//! Key codes are Linux evdev codes (`linux/input-event-codes.h`), so the
//! layout tables and the evdev reader share one vocabulary.

use core::time::Duration;

/// Input device trait for keyboards.
pub trait InputDevice {
    /// Wait up to `timeout` for the next key event.
    ///
    /// `Ok(None)` means nothing arrived in time. Implementations that can
    /// recover from a lost device report the loss once as
    /// [`InputError::DeviceLost`] and then return `Ok(None)` until it is
    /// back.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError>;
}

/// Input errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// No keyboard is attached.
    #[error("no keyboard found")]
    NotFound,
    /// The device went away (unplugged, read error).
    #[error("input device lost: {0}")]
    DeviceLost(#[source] std::io::Error),
}

/// Key transition reported by evdev (`value` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// value 0
    Released,
    /// value 1
    Pressed,
    /// value 2, auto-repeat
    Repeat,
}

impl KeyState {
    /// Decode the evdev `value` field.
    pub const fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Released),
            1 => Some(Self::Pressed),
            2 => Some(Self::Repeat),
            _ => None,
        }
    }

    /// Pressed or auto-repeat.
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Pressed | Self::Repeat)
    }
}

/// One key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Which key.
    pub code: KeyCode,
    /// What happened to it.
    pub state: KeyState,
}

impl InputEvent {
    /// Key press.
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            state: KeyState::Pressed,
        }
    }

    /// Key release.
    pub const fn release(code: KeyCode) -> Self {
        Self {
            code,
            state: KeyState::Released,
        }
    }
}

/// Linux evdev key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

#[allow(missing_docs)]
impl KeyCode {
    pub const ESC: Self = Self(1);
    pub const NUM_1: Self = Self(2);
    pub const NUM_2: Self = Self(3);
    pub const NUM_3: Self = Self(4);
    pub const NUM_4: Self = Self(5);
    pub const NUM_5: Self = Self(6);
    pub const NUM_6: Self = Self(7);
    pub const NUM_7: Self = Self(8);
    pub const NUM_8: Self = Self(9);
    pub const NUM_9: Self = Self(10);
    pub const NUM_0: Self = Self(11);
    pub const MINUS: Self = Self(12);
    pub const EQUAL: Self = Self(13);
    pub const BACKSPACE: Self = Self(14);
    pub const TAB: Self = Self(15);
    pub const Q: Self = Self(16);
    pub const W: Self = Self(17);
    pub const E: Self = Self(18);
    pub const R: Self = Self(19);
    pub const T: Self = Self(20);
    pub const Y: Self = Self(21);
    pub const U: Self = Self(22);
    pub const I: Self = Self(23);
    pub const O: Self = Self(24);
    pub const P: Self = Self(25);
    pub const LEFTBRACE: Self = Self(26);
    pub const RIGHTBRACE: Self = Self(27);
    pub const ENTER: Self = Self(28);
    pub const LEFTCTRL: Self = Self(29);
    pub const A: Self = Self(30);
    pub const S: Self = Self(31);
    pub const D: Self = Self(32);
    pub const F: Self = Self(33);
    pub const G: Self = Self(34);
    pub const H: Self = Self(35);
    pub const J: Self = Self(36);
    pub const K: Self = Self(37);
    pub const L: Self = Self(38);
    pub const SEMICOLON: Self = Self(39);
    pub const APOSTROPHE: Self = Self(40);
    pub const GRAVE: Self = Self(41);
    pub const LEFTSHIFT: Self = Self(42);
    pub const BACKSLASH: Self = Self(43);
    pub const Z: Self = Self(44);
    pub const X: Self = Self(45);
    pub const C: Self = Self(46);
    pub const V: Self = Self(47);
    pub const B: Self = Self(48);
    pub const N: Self = Self(49);
    pub const M: Self = Self(50);
    pub const COMMA: Self = Self(51);
    pub const DOT: Self = Self(52);
    pub const SLASH: Self = Self(53);
    pub const RIGHTSHIFT: Self = Self(54);
    pub const SPACE: Self = Self(57);
    pub const RIGHTCTRL: Self = Self(97);
    pub const HOME: Self = Self(102);
    pub const UP: Self = Self(103);
    pub const LEFT: Self = Self(105);
    pub const RIGHT: Self = Self(106);
    pub const END: Self = Self(107);
    pub const DOWN: Self = Self(108);
    pub const DELETE: Self = Self(111);
}

impl KeyCode {
    /// Left or right Ctrl.
    pub const fn is_ctrl(self) -> bool {
        matches!(self.0, 29 | 97)
    }

    /// Left or right Shift.
    pub const fn is_shift(self) -> bool {
        matches!(self.0, 42 | 54)
    }
}

/// Held modifier keys, tracked from press/release events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Either Ctrl held.
    pub ctrl: bool,
    /// Either Shift held.
    pub shift: bool,
}

impl Modifiers {
    /// Fold `event` into the modifier state.
    ///
    /// Returns `true` if the event was a modifier key and has been consumed.
    pub fn update(&mut self, event: &InputEvent) -> bool {
        if event.code.is_ctrl() {
            self.ctrl = event.state.is_down();
            true
        } else if event.code.is_shift() {
            self.shift = event.state.is_down();
            true
        } else {
            false
        }
    }
}
