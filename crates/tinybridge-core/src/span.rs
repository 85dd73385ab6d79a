//! Source locations for diagnostics.

use std::fmt;

/// Start position and length of a piece of script source.
///
/// Lines and columns are 1-indexed; columns count bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Extend `self` so it also covers `other`.
    ///
    /// Spans on different lines keep the start of `self` and add the lengths,
    /// which is good enough for caret rendering.
    pub fn merge(self, other: Span) -> Span {
        if self.line == other.line {
            let start = self.col.min(other.col);
            let end = (self.col + self.len).max(other.col + other.len);
            Span::new(self.line, start, end - start)
        } else {
            Span::new(self.line, self.col, self.len + other.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_line_colon_col() {
        assert_eq!(Span::new(3, 15, 5).to_string(), "3:15");
    }

    #[test]
    fn point_is_empty() {
        assert!(Span::point(1, 1).is_empty());
        assert!(!Span::new(1, 1, 2).is_empty());
    }

    #[test]
    fn merge_on_one_line_covers_both() {
        let merged = Span::new(2, 10, 3).merge(Span::new(2, 4, 2));
        assert_eq!(merged, Span::new(2, 4, 9));
    }

    #[test]
    fn merge_across_lines_keeps_start() {
        let merged = Span::new(1, 5, 4).merge(Span::new(3, 1, 2));
        assert_eq!((merged.line, merged.col, merged.len), (1, 5, 6));
    }
}
