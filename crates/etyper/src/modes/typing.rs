//! Typing mode: editing keys, shortcuts and autosave.

use std::time::Instant;

use platform::config::AUTOSAVE_INTERVAL;
use platform::{EpaperPanel, InputEvent, KeyCode};

use super::{Action, DeviceContext, ModeError, ModeKind};

fn moved(changed: bool) -> Action {
    if changed {
        Action::Render
    } else {
        Action::None
    }
}

/// Handle a key press or repeat.
pub fn handle_key<P: EpaperPanel, B>(
    ctx: &mut DeviceContext<P, B>,
    event: InputEvent,
    now: Instant,
) -> Result<Action, ModeError> {
    if ctx.modifiers.ctrl {
        return shortcut(ctx, event.code, now);
    }
    let editor = &mut ctx.editor;
    let action = match event.code {
        KeyCode::LEFT => moved(editor.left()),
        KeyCode::RIGHT => moved(editor.right()),
        KeyCode::UP => moved(editor.up()),
        KeyCode::DOWN => moved(editor.down()),
        KeyCode::HOME => moved(editor.home()),
        KeyCode::END => moved(editor.end()),
        KeyCode::BACKSPACE => moved(editor.backspace()),
        KeyCode::DELETE => moved(editor.delete()),
        KeyCode::ENTER => {
            editor.newline();
            Action::Render
        }
        KeyCode::TAB => {
            editor.tab();
            Action::Render
        }
        code => match ctx.layout.lookup(code, ctx.modifiers.shift) {
            Some(text) => {
                ctx.editor.insert_str(text);
                Action::Render
            }
            None => Action::None,
        },
    };
    Ok(action)
}

fn shortcut<P: EpaperPanel, B>(
    ctx: &mut DeviceContext<P, B>,
    code: KeyCode,
    now: Instant,
) -> Result<Action, ModeError> {
    let action = match code {
        KeyCode::Q => Action::Transition(ModeKind::Sleeping),
        KeyCode::S => {
            ctx.save(now)?;
            tracing::info!(path = %ctx.editor.document().path.display(), "saved");
            Action::Render
        }
        KeyCode::N => {
            ctx.new_document(now)?;
            Action::Render
        }
        KeyCode::R => Action::FullRefresh,
        KeyCode::LEFT => moved(ctx.switch_document(false, now)?),
        KeyCode::RIGHT => moved(ctx.switch_document(true, now)?),
        KeyCode::F => Action::Transition(ModeKind::FileServer),
        KeyCode::K => Action::Transition(ModeKind::LayoutPicker),
        _ => Action::None,
    };
    Ok(action)
}

/// Autosave once the document has been dirty for a while.
///
/// A failed save is reported once and not retried until the next
/// interval.
pub fn tick<P: EpaperPanel, B>(ctx: &mut DeviceContext<P, B>, now: Instant) -> Result<Action, ModeError> {
    if !ctx.editor.is_dirty() || now.saturating_duration_since(ctx.last_save()) < AUTOSAVE_INTERVAL {
        return Ok(Action::None);
    }
    ctx.save(now)?;
    tracing::info!(path = %ctx.editor.document().path.display(), "autosaved");
    Ok(Action::Render)
}
