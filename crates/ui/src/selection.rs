//! List selection state: a cursor over a fixed-length list that wraps
//! around at both ends.

/// Selected index into a list of `len` items.
///
/// An empty list has no selection; moving is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSelection {
    index: usize,
    len: usize,
}

impl ListSelection {
    /// Select `index` (clamped) in a list of `len` items.
    pub fn new(len: usize, index: usize) -> Self {
        ListSelection {
            index: index.min(len.saturating_sub(1)),
            len,
        }
    }

    /// Return the selected index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move down one item, wrapping from the last to the first.
    pub fn next(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    /// Move up one item, wrapping from the first to the last.
    pub fn prev(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }
}
