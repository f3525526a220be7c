//! Text editing on the current document.
//!
//! The cursor is a character offset into the document text. Vertical
//! movement, Home and End work on visual (wrapped) lines.

use ui::{CursorPos, TextLayout, Viewport, VisualLine};

use crate::document::Document;

/// Spaces inserted for Tab.
pub const TAB_WIDTH: usize = 4;

/// Document plus cursor and scroll position.
#[derive(Debug, Clone)]
pub struct Editor {
    doc: Document,
    cursor: usize,
    viewport: Viewport,
    columns: usize,
    page_lines: usize,
}

impl Editor {
    /// Editor on `doc` with the cursor at the end of the text.
    pub fn new(doc: Document, columns: usize, page_lines: usize) -> Self {
        let mut editor = Self {
            cursor: 0,
            doc,
            viewport: Viewport::default(),
            columns: columns.max(1),
            page_lines: page_lines.max(1),
        };
        editor.open(None);
        editor
    }

    /// Replace the document (or reset the cursor when `None`); cursor to
    /// the end of the text.
    fn open(&mut self, doc: Option<Document>) {
        if let Some(doc) = doc {
            self.doc = doc;
        }
        self.cursor = self.doc.text.chars().count();
        self.viewport = Viewport::default();
        self.follow();
    }

    /// Switch to another document.
    pub fn replace_document(&mut self, doc: Document) {
        self.open(Some(doc));
    }

    /// Current document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Current document, mutably (for saving).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.doc.dirty
    }

    /// Cursor as a character offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Characters per line.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Lines per page.
    pub fn page_lines(&self) -> usize {
        self.page_lines
    }

    /// Current wrap of the text.
    pub fn layout(&self) -> TextLayout {
        TextLayout::new(&self.doc.text, self.columns)
    }

    /// Cursor position on the wrapped text.
    pub fn cursor_pos(&self) -> CursorPos {
        self.layout().position_of(self.cursor)
    }

    /// Index of the top visible line.
    pub fn scroll(&self) -> usize {
        self.viewport.scroll
    }

    /// Visible lines and the cursor's `(row, col)` on the page.
    pub fn page(&self) -> (Vec<VisualLine>, Option<(usize, usize)>) {
        let layout = self.layout();
        let pos = layout.position_of(self.cursor);
        let lines = self.viewport.visible(&layout, self.page_lines).to_vec();
        let row = pos.line.checked_sub(self.viewport.scroll);
        let cursor = row.filter(|r| *r < self.page_lines).map(|r| (r, pos.col));
        (lines, cursor)
    }

    fn follow(&mut self) {
        let line = self.cursor_pos().line;
        self.viewport.follow(line, self.page_lines);
    }

    fn byte_index(&self, char_offset: usize) -> usize {
        self.doc
            .text
            .char_indices()
            .nth(char_offset)
            .map_or(self.doc.text.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.doc.text.chars().count()
    }

    fn edited(&mut self) {
        self.doc.dirty = true;
        self.follow();
    }

    /// Insert `s` at the cursor.
    pub fn insert_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.doc.text.insert_str(at, s);
        self.cursor += s.chars().count();
        self.edited();
    }

    /// Line break at the cursor.
    pub fn newline(&mut self) {
        self.insert_str("\n");
    }

    /// Tab: four spaces.
    pub fn tab(&mut self) {
        self.insert_str(&" ".repeat(TAB_WIDTH));
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.doc.text.remove(at);
        self.edited();
        true
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.doc.text.remove(at);
        self.edited();
        true
    }

    fn move_to(&mut self, offset: usize) -> bool {
        let offset = offset.min(self.char_len());
        if offset == self.cursor {
            return false;
        }
        self.cursor = offset;
        self.follow();
        true
    }

    /// One character left. Returns whether the cursor moved.
    pub fn left(&mut self) -> bool {
        match self.cursor.checked_sub(1) {
            Some(c) => self.move_to(c),
            None => false,
        }
    }

    /// One character right.
    pub fn right(&mut self) -> bool {
        self.move_to(self.cursor + 1)
    }

    /// Same column on the previous visual line.
    pub fn up(&mut self) -> bool {
        let layout = self.layout();
        let pos = layout.position_of(self.cursor);
        match pos.line.checked_sub(1) {
            Some(line) => self.move_to(layout.offset_at(line, pos.col)),
            None => false,
        }
    }

    /// Same column on the next visual line.
    pub fn down(&mut self) -> bool {
        let layout = self.layout();
        let pos = layout.position_of(self.cursor);
        if pos.line + 1 < layout.line_count() {
            self.move_to(layout.offset_at(pos.line + 1, pos.col))
        } else {
            false
        }
    }

    /// Start of the visual line.
    pub fn home(&mut self) -> bool {
        let layout = self.layout();
        let pos = layout.position_of(self.cursor);
        self.move_to(layout.offset_at(pos.line, 0))
    }

    /// End of the visual line.
    pub fn end(&mut self) -> bool {
        let layout = self.layout();
        let pos = layout.position_of(self.cursor);
        let len = layout.line(pos.line).map_or(0, VisualLine::len);
        self.move_to(layout.offset_at(pos.line, len))
    }
}
