//! Status line state: document name and unsaved-changes marker.

use core::fmt::Write;

/// State for the one-line status bar under the text.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    /// Document file name (up to 64 UTF-8 bytes; longer names are cut).
    pub doc_name: heapless::String<64>,
    /// Whether the buffer has unsaved changes.
    pub dirty: bool,
}

impl StatusLine {
    /// Set the document name, truncating at a character boundary.
    pub fn set_doc_name(&mut self, name: &str) {
        self.doc_name.clear();
        for c in name.chars() {
            if self.doc_name.push(c).is_err() {
                break;
            }
        }
    }

    /// Set the unsaved-changes marker.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Text to draw: `*` when dirty, then the document name, cut to
    /// `max_chars` characters.
    #[must_use]
    pub fn text(&self, max_chars: usize) -> heapless::String<72> {
        let mut out = heapless::String::new();
        let marker = if self.dirty { "*" } else { "" };
        for c in marker.chars().chain(self.doc_name.chars()).take(max_chars) {
            if out.write_char(c).is_err() {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::StatusLine;

    #[test]
    fn test_status_clean_shows_name() {
        let mut s = StatusLine::default();
        s.set_doc_name("doc_20240101_120000.txt");
        assert_eq!(s.text(38).as_str(), "doc_20240101_120000.txt");
    }

    #[test]
    fn test_status_dirty_marker() {
        let mut s = StatusLine::default();
        s.set_doc_name("doc.txt");
        s.set_dirty(true);
        assert_eq!(s.text(38).as_str(), "*doc.txt");
    }

    #[test]
    fn test_status_truncates_to_width() {
        let mut s = StatusLine::default();
        s.set_doc_name("abcdefghij");
        s.set_dirty(true);
        assert_eq!(s.text(5).as_str(), "*abcd");
    }

    #[test]
    fn test_long_name_is_cut_not_rejected() {
        let mut s = StatusLine::default();
        s.set_doc_name(&"x".repeat(100));
        assert_eq!(s.doc_name.len(), 64);
    }
}
