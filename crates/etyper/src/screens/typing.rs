//! Editor page: wrapped text, block cursor, status bar.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

use ui::VisualLine;

use super::{draw_text, rule, CELL_H, CHAR_W, LINE_H, MARGIN_X, MARGIN_Y, STATUS_Y, WIDTH};

/// What the typing screen shows.
#[derive(Debug, Clone, Copy)]
pub struct TypingScreen<'a> {
    /// Visible lines, top first.
    pub lines: &'a [VisualLine],
    /// Cursor as `(row, col)` within `lines`, if on the page.
    pub cursor: Option<(usize, usize)>,
    /// Status bar text.
    pub status: &'a str,
}

impl TypingScreen<'_> {
    /// Draw the page.
    pub fn render<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        display.clear(BinaryColor::Off)?;

        let mut y = MARGIN_Y;
        for line in self.lines {
            draw_text(display, &line.text, MARGIN_X, y, BinaryColor::On)?;
            y += LINE_H;
        }

        if let Some((row, col)) = self.cursor {
            let cx = MARGIN_X + col as i32 * CHAR_W;
            let cy = MARGIN_Y + row as i32 * LINE_H;
            // no block past the right margin
            if cx + CHAR_W <= WIDTH - MARGIN_X {
                Rectangle::new(Point::new(cx, cy), Size::new(CHAR_W as u32, CELL_H as u32))
                    .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                    .draw(display)?;
                let under = self
                    .lines
                    .get(row)
                    .and_then(|l| l.text.chars().nth(col));
                if let Some(c) = under {
                    let mut buf = [0u8; 4];
                    draw_text(display, c.encode_utf8(&mut buf), cx, cy, BinaryColor::Off)?;
                }
            }
        }

        rule(display, STATUS_Y - 2)?;
        draw_text(display, self.status, MARGIN_X, STATUS_Y, BinaryColor::On)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{area, frame};
    use super::*;
    use ui::TextLayout;

    #[test]
    fn test_text_and_status_drawn() {
        let layout = TextLayout::new("Hello", 38);
        let mut f = frame();
        TypingScreen {
            lines: layout.lines(),
            cursor: None,
            status: "*doc.txt",
        }
        .render(&mut f)
        .unwrap();
        assert!(f.ink_in(&area(8, 10, 50, 20)) > 0);
        // nothing right of the text on line 0
        assert_eq!(f.ink_in(&area(60, 10, 340, 20)), 0);
        // status rule spans the margins
        assert_eq!(f.ink_in(&area(8, 268, 385, 1)), 385);
        assert!(f.ink_in(&area(8, 270, 80, 20)) > 0);
    }

    #[test]
    fn test_cursor_block_inverts_character() {
        let layout = TextLayout::new("ab", 38);
        let mut f = frame();
        TypingScreen {
            lines: layout.lines(),
            cursor: Some((0, 1)),
            status: "",
        }
        .render(&mut f)
        .unwrap();
        let cell = area(18, 10, 10, 20);
        let ink = f.ink_in(&cell);
        // mostly black with a white glyph cut out
        assert!(ink > 100 && ink < 200, "ink = {ink}");
    }

    #[test]
    fn test_cursor_at_end_of_text_is_solid() {
        let layout = TextLayout::new("ab", 38);
        let mut f = frame();
        TypingScreen {
            lines: layout.lines(),
            cursor: Some((0, 2)),
            status: "",
        }
        .render(&mut f)
        .unwrap();
        assert_eq!(f.ink_in(&area(28, 10, 10, 20)), 200);
    }

    #[test]
    fn test_cursor_past_margin_not_drawn() {
        let mut f = frame();
        TypingScreen {
            lines: &[],
            cursor: Some((0, 38)),
            status: "",
        }
        .render(&mut f)
        .unwrap();
        assert_eq!(f.ink_in(&area(0, 0, 400, 260)), 0);
    }

    #[test]
    fn test_lines_step_by_line_height() {
        let layout = TextLayout::new("a\nb", 38);
        let mut f = frame();
        TypingScreen {
            lines: layout.lines(),
            cursor: None,
            status: "",
        }
        .render(&mut f)
        .unwrap();
        assert!(f.ink_in(&area(8, 34, 10, 20)) > 0);
        assert_eq!(f.ink_in(&area(8, 30, 10, 4)), 0);
    }
}
