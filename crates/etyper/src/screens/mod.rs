//! Full-screen layouts drawn into any 1bpp `DrawTarget`.
//!
//! Every screen clears to white first, so the result depends only on its
//! inputs.

// Screen coordinates are small (400×300); casts between usize/u32/i32 on
// them cannot overflow.
#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use embedded_graphics::mono_font::iso_8859_1::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};

pub mod file_server;
pub mod picker;
pub mod typing;

pub use file_server::FileServerScreen;
pub use picker::PickerScreen;
pub use typing::TypingScreen;

/// Panel width.
pub const WIDTH: i32 = 400;
/// Panel height.
pub const HEIGHT: i32 = 300;
/// Left/right text margin.
pub const MARGIN_X: i32 = 8;
/// Top/bottom text margin.
pub const MARGIN_Y: i32 = 10;
/// Glyph cell width.
pub const CHAR_W: i32 = 10;
/// Glyph cell height.
pub const CELL_H: i32 = 20;
/// Baseline-to-baseline distance of text lines.
pub const LINE_H: i32 = 24;
/// Characters per text line.
pub const COLUMNS: usize = ((WIDTH - 2 * MARGIN_X) / CHAR_W) as usize;
/// Text lines above the status bar.
pub const PAGE_LINES: usize = 10;
/// Top of the status bar text.
pub const STATUS_Y: i32 = HEIGHT - MARGIN_Y - CELL_H;

fn style(color: BinaryColor) -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_10X20, color)
}

fn draw_text<D>(display: &mut D, text: &str, x: i32, y: i32, color: BinaryColor) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_baseline(text, Point::new(x, y), style(color), Baseline::Top).draw(display)?;
    Ok(())
}

fn draw_centered<D>(display: &mut D, text: &str, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let width = text.chars().count() as i32 * CHAR_W;
    draw_text(display, text, (WIDTH - width) / 2, y, BinaryColor::On)
}

fn rule<D>(display: &mut D, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Line::new(Point::new(MARGIN_X, y), Point::new(WIDTH - MARGIN_X, y))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)
}

/// All white.
pub struct BlankScreen;

impl BlankScreen {
    /// Clear the display.
    pub fn render<D>(display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        display.clear(BinaryColor::Off)
    }
}
