//! Layout picker: Up/Down to move, Enter to choose, Esc or Ctrl+K to
//! cancel.

use platform::{EpaperPanel, InputEvent, KeyCode};
use ui::{LayoutId, ListSelection};

use super::{Action, DeviceContext, ModeKind};

/// Selection to start with: the active layout.
pub fn initial_selection(current: LayoutId) -> ListSelection {
    ListSelection::new(LayoutId::ALL.len(), current.index())
}

/// Handle a key press or repeat.
pub fn handle_key<P: EpaperPanel, B>(
    ctx: &mut DeviceContext<P, B>,
    selection: &mut ListSelection,
    event: InputEvent,
) -> Action {
    match event.code {
        KeyCode::K if ctx.modifiers.ctrl => Action::Transition(ModeKind::Typing),
        _ if ctx.modifiers.ctrl => Action::None,
        KeyCode::UP => {
            selection.prev();
            Action::Render
        }
        KeyCode::DOWN => {
            selection.next();
            Action::Render
        }
        KeyCode::ENTER => {
            if let Some(&layout) = LayoutId::ALL.get(selection.index()) {
                ctx.layout = layout;
                if let Err(e) = ctx.store.save_layout(layout) {
                    tracing::warn!(error = %e, "layout preference not saved");
                }
                tracing::info!(layout = layout.name(), "keyboard layout selected");
            }
            Action::Transition(ModeKind::Typing)
        }
        KeyCode::ESC => Action::Transition(ModeKind::Typing),
        _ => Action::None,
    }
}
