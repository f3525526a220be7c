//! File-server mode: Ctrl+F or the auto-off timeout returns to typing.

use std::time::Instant;

use platform::config::FILE_SERVER_TIMEOUT;
use platform::{InputEvent, KeyCode, KeyState, Modifiers};

use super::{Action, ModeKind};

/// Stop on a Ctrl+F press.
pub fn handle_key(modifiers: Modifiers, event: InputEvent) -> Action {
    if modifiers.ctrl && event.code == KeyCode::F && event.state == KeyState::Pressed {
        tracing::info!("file server stopped by user");
        Action::Transition(ModeKind::Typing)
    } else {
        Action::None
    }
}

/// Stop once the session has run for the auto-off period.
pub fn tick(started: Instant, now: Instant) -> Action {
    if now.saturating_duration_since(started) >= FILE_SERVER_TIMEOUT {
        tracing::info!(timeout_s = FILE_SERVER_TIMEOUT.as_secs(), "file server timed out");
        Action::Transition(ModeKind::Typing)
    } else {
        Action::None
    }
}
