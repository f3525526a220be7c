//! Keyboard layout list.
//!
//! More layouts exist than rows fit between the title and the hint, so the
//! list scrolls to keep the selection visible.

use core::ops::Range;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

use ui::ListSelection;

use super::{draw_centered, draw_text, rule, CELL_H, LINE_H, MARGIN_X, MARGIN_Y, STATUS_Y, WIDTH};

const TITLE: &str = "-- Keyboard Layout --";
const HINT: &str = "Enter=select  Esc=cancel";

/// First item row.
pub const ITEMS_TOP: i32 = MARGIN_Y + LINE_H + 14;
/// Distance between item rows.
pub const ITEM_STEP: i32 = LINE_H + 4;
/// Item rows on screen.
pub const VISIBLE_ROWS: usize = 7;

const HINT_Y: i32 = STATUS_Y - 2;

/// Rows of a `len`-item list shown with `selected` visible.
pub fn visible_window(len: usize, selected: usize, rows: usize) -> Range<usize> {
    let rows = rows.max(1);
    if len <= rows {
        return 0..len;
    }
    let first = selected.saturating_sub(rows - 1).min(len - rows);
    first..first + rows
}

/// What the picker shows.
#[derive(Debug, Clone, Copy)]
pub struct PickerScreen<'a> {
    /// Item labels.
    pub items: &'a [&'a str],
    /// Highlighted item.
    pub selection: ListSelection,
}

impl PickerScreen<'_> {
    /// Draw the list.
    pub fn render<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        display.clear(BinaryColor::Off)?;
        draw_centered(display, TITLE, MARGIN_Y + 4)?;
        rule(display, MARGIN_Y + LINE_H + 6)?;

        let selected = self.selection.index();
        let mut y = ITEMS_TOP;
        for index in visible_window(self.items.len(), selected, VISIBLE_ROWS) {
            let Some(name) = self.items.get(index) else {
                break;
            };
            if index == selected {
                Rectangle::with_corners(
                    Point::new(MARGIN_X - 2, y - 1),
                    Point::new(WIDTH - MARGIN_X + 2, y + CELL_H),
                )
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(display)?;
                draw_text(display, &format!("> {name}"), MARGIN_X + 2, y, BinaryColor::Off)?;
            } else {
                draw_text(display, &format!("  {name}"), MARGIN_X + 2, y, BinaryColor::On)?;
            }
            y += ITEM_STEP;
        }

        rule(display, HINT_Y - 2)?;
        draw_centered(display, HINT, HINT_Y)
    }
}
