//! Word wrap with cursor tracking.
//!
//! Text is split into paragraphs at `'\n'`; each paragraph is wrapped
//! greedily to a fixed number of character cells:
//!
//! - runs of whitespace and non-whitespace are the wrap units
//! - whitespace at a line break is dropped, except at the very start of a
//!   paragraph
//! - words longer than a line are split across lines
//! - an empty paragraph is one empty visual line
//!
//! Every visual line remembers the character offset where it starts, so a
//! cursor offset maps to `(line, column)` and back without re-wrapping.
//! Offsets and columns count `char`s, not bytes.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Range;

/// One wrapped line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLine {
    /// Character offset of the first character in the source text.
    pub start: usize,
    /// Displayed characters; whitespace is shown as spaces.
    pub text: String,
    len: usize,
}

impl VisualLine {
    /// Number of characters on the line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the line has no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Character offset one past the last character.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Cursor location on the wrapped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPos {
    /// Visual line index.
    pub line: usize,
    /// Column within the line, `0..=line.len()`.
    pub col: usize,
}

#[derive(Debug, Clone)]
struct Paragraph {
    /// Offset of the first character.
    start: usize,
    /// Offset of the terminating `'\n'`, or the text length.
    end: usize,
    /// Visual lines belonging to this paragraph.
    lines: Range<usize>,
}

/// Wrapped text.
#[derive(Debug, Clone)]
pub struct TextLayout {
    lines: Vec<VisualLine>,
    paragraphs: Vec<Paragraph>,
    width: usize,
}

#[derive(Debug, Clone, Copy)]
struct Chunk {
    start: usize,
    len: usize,
    space: bool,
}

/// Split a paragraph into whitespace / non-whitespace runs.
fn chunks(chars: &[char]) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        let space = c.is_whitespace();
        match out.last_mut() {
            Some(last) if last.space == space => last.len += 1,
            _ => out.push(Chunk {
                start: i,
                len: 1,
                space,
            }),
        }
    }
    out
}

/// Wrap one paragraph, returning `(start, len)` ranges relative to it.
fn wrap_paragraph(chars: &[char], width: usize) -> Vec<(usize, usize)> {
    let width = width.max(1);
    // Reversed so the next chunk is at the end.
    let mut pending: Vec<Chunk> = chunks(chars);
    pending.reverse();
    let mut lines: Vec<(usize, usize)> = Vec::new();

    while !pending.is_empty() {
        if !lines.is_empty() && pending.last().is_some_and(|c| c.space) {
            pending.pop();
        }

        let mut line: Vec<Chunk> = Vec::new();
        let mut used = 0usize;
        while let Some(&next) = pending.last() {
            if used + next.len <= width {
                line.push(next);
                used += next.len;
                pending.pop();
            } else {
                break;
            }
        }

        if let Some(next) = pending.last_mut() {
            if next.len > width {
                let take = width - used;
                if take > 0 {
                    line.push(Chunk {
                        start: next.start,
                        len: take,
                        space: next.space,
                    });
                    next.start += take;
                    next.len -= take;
                }
            }
        }

        if line.last().is_some_and(|c| c.space) {
            line.pop();
        }
        if let (Some(first), Some(last)) = (line.first(), line.last()) {
            lines.push((first.start, last.start + last.len - first.start));
        }
    }
    lines
}

impl TextLayout {
    /// Wrap `text` to `width` character cells per line.
    #[must_use]
    pub fn new(text: &str, width: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut lines = Vec::new();
        let mut paragraphs = Vec::new();

        let mut start = 0usize;
        loop {
            let end = chars
                .get(start..)
                .and_then(|rest| rest.iter().position(|&c| c == '\n'))
                .map_or(chars.len(), |p| start + p);
            let para = chars.get(start..end).unwrap_or_default();

            let first_line = lines.len();
            let wrapped = wrap_paragraph(para, width);
            if wrapped.is_empty() {
                lines.push(VisualLine {
                    start,
                    text: String::new(),
                    len: 0,
                });
            }
            for (s, len) in wrapped {
                let text = para
                    .get(s..s + len)
                    .unwrap_or_default()
                    .iter()
                    .map(|&c| if c.is_whitespace() { ' ' } else { c })
                    .collect();
                lines.push(VisualLine {
                    start: start + s,
                    text,
                    len,
                });
            }
            paragraphs.push(Paragraph {
                start,
                end,
                lines: first_line..lines.len(),
            });

            if end >= chars.len() {
                break;
            }
            start = end + 1;
        }

        Self {
            lines,
            paragraphs,
            width,
        }
    }

    /// Wrap width in character cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// All visual lines; never empty.
    #[must_use]
    pub fn lines(&self) -> &[VisualLine] {
        &self.lines
    }

    /// Number of visual lines (at least 1).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Visual line by index.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&VisualLine> {
        self.lines.get(index)
    }

    /// Where the cursor at character offset `offset` is drawn.
    ///
    /// Offsets past the end of the text map to the end of the last line.
    /// Whitespace swallowed by a line break maps to the end of the line
    /// before it.
    #[must_use]
    pub fn position_of(&self, offset: usize) -> CursorPos {
        let Some(para) = self
            .paragraphs
            .iter()
            .find(|p| p.start <= offset && offset <= p.end)
        else {
            return self.end_position();
        };

        let mut found: Option<CursorPos> = None;
        for index in para.lines.clone() {
            let Some(line) = self.lines.get(index) else {
                break;
            };
            if line.start > offset {
                break;
            }
            found = Some(CursorPos {
                line: index,
                col: (offset - line.start).min(line.len),
            });
        }
        found.unwrap_or(CursorPos {
            line: para.lines.start,
            col: 0,
        })
    }

    fn end_position(&self) -> CursorPos {
        let line = self.lines.len().saturating_sub(1);
        CursorPos {
            line,
            col: self.lines.get(line).map_or(0, VisualLine::len),
        }
    }

    /// Character offset of `(line, col)`; the column is clamped to the line.
    #[must_use]
    pub fn offset_at(&self, line: usize, col: usize) -> usize {
        match self.lines.get(line) {
            Some(l) => l.start + col.min(l.len),
            None => self.lines.last().map_or(0, VisualLine::end),
        }
    }
}

/// First visible line of a page-sized window onto the wrapped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Index of the top visible line.
    pub scroll: usize,
}

impl Viewport {
    /// Scroll the minimum amount that makes `line` visible on a page of
    /// `page_lines` lines.
    pub fn follow(&mut self, line: usize, page_lines: usize) {
        let page = page_lines.max(1);
        if line < self.scroll {
            self.scroll = line;
        } else if line >= self.scroll + page {
            self.scroll = line + 1 - page;
        }
    }

    /// Lines `scroll..scroll + page_lines`, clipped to the layout.
    #[must_use]
    pub fn visible<'a>(&self, layout: &'a TextLayout, page_lines: usize) -> &'a [VisualLine] {
        let lines = layout.lines();
        let start = self.scroll.min(lines.len());
        let end = (self.scroll + page_lines).min(lines.len());
        lines.get(start..end).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn texts(layout: &TextLayout) -> Vec<&str> {
        layout.lines().iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_empty_text_is_one_empty_line() {
        let layout = TextLayout::new("", 10);
        assert_eq!(texts(&layout), vec![""]);
        assert_eq!(layout.position_of(0), CursorPos { line: 0, col: 0 });
    }

    #[test]
    fn test_wraps_at_word_boundaries() {
        let layout = TextLayout::new("the quick brown fox", 10);
        assert_eq!(texts(&layout), vec!["the quick", "brown fox"]);
        assert_eq!(layout.lines()[1].start, 10);
    }

    #[test]
    fn test_breaks_long_words() {
        let layout = TextLayout::new("abcdefghijklmnopqrstuvwxyz", 10);
        assert_eq!(texts(&layout), vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
        // Contiguous lines: the break position belongs to the next line.
        assert_eq!(layout.position_of(10), CursorPos { line: 1, col: 0 });
    }

    #[test]
    fn test_long_word_fills_rest_of_line() {
        let layout = TextLayout::new("ab cdefghijklmno", 10);
        assert_eq!(texts(&layout), vec!["ab cdefghi", "jklmno"]);
    }

    #[test]
    fn test_hyphens_do_not_break() {
        let layout = TextLayout::new("well-known words", 12);
        assert_eq!(texts(&layout), vec!["well-known", "words"]);
    }

    #[test]
    fn test_newlines_make_paragraphs() {
        let layout = TextLayout::new("one\n\ntwo\n", 10);
        assert_eq!(texts(&layout), vec!["one", "", "two", ""]);
    }

    #[test]
    fn test_leading_whitespace_kept_trailing_dropped() {
        let layout = TextLayout::new("    indented   ", 20);
        assert_eq!(texts(&layout), vec!["    indented"]);
    }

    #[test]
    fn test_whitespace_only_paragraph_is_empty_line() {
        let layout = TextLayout::new("   ", 10);
        assert_eq!(texts(&layout), vec![""]);
        assert_eq!(layout.position_of(2), CursorPos { line: 0, col: 0 });
        assert_eq!(layout.position_of(3), CursorPos { line: 0, col: 0 });
    }

    #[test]
    fn test_cursor_inside_and_at_end() {
        let layout = TextLayout::new("hello world", 8);
        assert_eq!(texts(&layout), vec!["hello", "world"]);
        assert_eq!(layout.position_of(1), CursorPos { line: 0, col: 1 });
        assert_eq!(layout.position_of(6), CursorPos { line: 1, col: 0 });
        assert_eq!(layout.position_of(11), CursorPos { line: 1, col: 5 });
    }

    #[test]
    fn test_dropped_space_maps_to_end_of_previous_line() {
        let layout = TextLayout::new("hello world", 8);
        assert_eq!(layout.position_of(5), CursorPos { line: 0, col: 5 });
    }

    #[test]
    fn test_several_dropped_spaces_all_map_to_line_end() {
        let layout = TextLayout::new("abc      def", 5);
        assert_eq!(texts(&layout), vec!["abc", "def"]);
        for offset in 3..9 {
            assert_eq!(layout.position_of(offset), CursorPos { line: 0, col: 3 });
        }
        assert_eq!(layout.position_of(9), CursorPos { line: 1, col: 0 });
    }

    #[test]
    fn test_newline_maps_to_end_of_its_line() {
        let layout = TextLayout::new("ab\ncd", 10);
        assert_eq!(layout.position_of(2), CursorPos { line: 0, col: 2 });
        assert_eq!(layout.position_of(3), CursorPos { line: 1, col: 0 });
    }

    #[test]
    fn test_offsets_past_end_clamp() {
        let layout = TextLayout::new("ab", 10);
        assert_eq!(layout.position_of(99), CursorPos { line: 0, col: 2 });
        assert_eq!(layout.offset_at(5, 0), 2);
    }

    #[test]
    fn test_offset_at_clamps_column() {
        let layout = TextLayout::new("hello world", 8);
        assert_eq!(layout.offset_at(1, 3), 9);
        assert_eq!(layout.offset_at(1, 99), 11);
        assert_eq!(layout.offset_at(0, 99), 5);
    }

    #[test]
    fn test_multibyte_characters_count_as_one_cell() {
        let layout = TextLayout::new("äöü ßé", 3);
        assert_eq!(texts(&layout), vec!["äöü", "ßé"]);
        assert_eq!(layout.position_of(6), CursorPos { line: 1, col: 2 });
    }

    #[test]
    fn test_tabs_display_as_spaces() {
        let layout = TextLayout::new("a\tb", 10);
        assert_eq!(texts(&layout), vec!["a b"]);
    }

    #[test]
    fn test_viewport_follows_cursor() {
        let mut vp = Viewport::default();
        vp.follow(3, 10);
        assert_eq!(vp.scroll, 0);
        vp.follow(12, 10);
        assert_eq!(vp.scroll, 3);
        vp.follow(1, 10);
        assert_eq!(vp.scroll, 1);
    }

    #[test]
    fn test_viewport_visible_slice() {
        let layout = TextLayout::new("a\nb\nc\nd", 10);
        let vp = Viewport { scroll: 2 };
        let visible: Vec<&str> = vp
            .visible(&layout, 10)
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(visible, vec!["c", "d"]);
    }
}
