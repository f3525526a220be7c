//! Sleep: panel blank and in deep sleep until Ctrl+Q is pressed again.

use platform::{InputEvent, KeyCode, KeyState, Modifiers};

use super::{Action, ModeKind};

/// Wake on a fresh Ctrl+Q press; auto-repeat of the Ctrl+Q that put the
/// device to sleep is ignored.
pub fn handle_key(modifiers: Modifiers, event: InputEvent) -> Action {
    if modifiers.ctrl && event.code == KeyCode::Q && event.state == KeyState::Pressed {
        Action::Transition(ModeKind::Typing)
    } else {
        Action::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
    };

    #[test]
    fn test_only_ctrl_q_press_wakes() {
        assert_eq!(
            handle_key(CTRL, InputEvent::press(KeyCode::Q)),
            Action::Transition(ModeKind::Typing)
        );
        let repeat = InputEvent {
            code: KeyCode::Q,
            state: KeyState::Repeat,
        };
        assert_eq!(handle_key(CTRL, repeat), Action::None);
        assert_eq!(handle_key(Modifiers::default(), InputEvent::press(KeyCode::Q)), Action::None);
        assert_eq!(handle_key(CTRL, InputEvent::press(KeyCode::S)), Action::None);
    }
}
