//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count bytes, as Go tooling does
//!
//! [`LineIndex`] precomputes line starts once per file so repeated lookups
//! are a binary search; the free functions are one-shot conveniences.

use crate::edit::Span;

/// Line-start table for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the index for `content`.
    pub fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            starts,
            len: content.len(),
        }
    }

    /// Convert a byte offset to 1-indexed `(line, col)`.
    ///
    /// Offsets past the end are clamped to the end of the content.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = self.starts.partition_point(|&s| s <= offset) - 1;
        ((line + 1) as u32, (offset - self.starts[line] + 1) as u32)
    }

    /// 1-indexed line number of a byte offset.
    pub fn line(&self, offset: usize) -> u32 {
        self.position(offset).0
    }

    /// Convert 1-indexed `(line, col)` to a byte offset.
    ///
    /// Returns `None` if the line does not exist. Columns past the end of the
    /// line are clamped to the line end.
    pub fn offset(&self, line: u32, col: u32) -> Option<usize> {
        let line = line.max(1) as usize - 1;
        let start = *self.starts.get(line)?;
        let end = self
            .starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        Some((start + col.max(1) as usize - 1).min(end))
    }

    /// Byte offset of the start of a 1-indexed line.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.starts.get(line.max(1) as usize - 1).copied()
    }

    /// Number of lines (a trailing newline does not start a new line).
    pub fn line_count(&self) -> u32 {
        if self.len == 0 {
            0
        } else if self.starts.last() == Some(&self.len) {
            (self.starts.len() - 1) as u32
        } else {
            self.starts.len() as u32
        }
    }
}

/// Convert a byte offset to 1-indexed line and column.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    LineIndex::new(content).position(offset)
}

/// Convert 1-indexed line and column to a byte offset, clamping to the end
/// of the content when the line does not exist.
pub fn position_to_byte_offset(content: &str, line: u32, col: u32) -> usize {
    LineIndex::new(content)
        .offset(line, col)
        .unwrap_or(content.len())
}

/// Extract the text of a span.
///
/// Returns `None` if the span extends beyond the content or splits a
/// character.
pub fn extract_span<'a>(content: &'a str, span: &Span) -> Option<&'a str> {
    content.get(span.start..span.end)
}

/// Shrink a span so that it excludes leading and trailing whitespace.
pub fn trim_span(content: &str, span: Span) -> Span {
    let Some(text) = extract_span(content, &span) else {
        return span;
    };
    let leading = text.len() - text.trim_start().len();
    let trailing = text.len() - text.trim_end().len();
    if leading == text.len() {
        return Span::new(span.start, span.start);
    }
    Span::new(span.start + leading, span.end - trailing)
}

/// Byte offsets of the start and end (exclusive, newline included) of the
/// lines covered by `span`.
pub fn line_bounds(content: &str, span: Span) -> Span {
    let start = content[..span.start.min(content.len())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let tail_from = span.end.max(span.start).min(content.len());
    let end = content[tail_from..]
        .find('\n')
        .map(|i| tail_from + i + 1)
        .unwrap_or(content.len());
    Span::new(start, end)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod line_index_tests {
        use super::*;

        #[test]
        fn offset_to_position_simple() {
            let index = LineIndex::new("line1\nline2\nline3\n");
            assert_eq!(index.position(0), (1, 1));
            assert_eq!(index.position(4), (1, 5));
            assert_eq!(index.position(5), (1, 6));
            assert_eq!(index.position(6), (2, 1));
            assert_eq!(index.position(12), (3, 1));
        }

        #[test]
        fn position_to_offset_simple() {
            let index = LineIndex::new("line1\nline2\nline3\n");
            assert_eq!(index.offset(1, 1), Some(0));
            assert_eq!(index.offset(2, 3), Some(8));
            assert_eq!(index.offset(3, 1), Some(12));
            assert_eq!(index.offset(9, 1), None);
        }

        #[test]
        fn column_is_clamped_to_line_end() {
            let index = LineIndex::new("ab\ncd\n");
            assert_eq!(index.offset(1, 50), Some(2));
        }

        #[test]
        fn offset_past_end_is_clamped() {
            let index = LineIndex::new("ab\ncd");
            assert_eq!(index.position(100), (2, 3));
        }

        #[test]
        fn line_count_ignores_trailing_newline() {
            assert_eq!(LineIndex::new("").line_count(), 0);
            assert_eq!(LineIndex::new("a").line_count(), 1);
            assert_eq!(LineIndex::new("a\nb\n").line_count(), 2);
            assert_eq!(LineIndex::new("a\nb").line_count(), 2);
        }
    }

    mod span_tests {
        use super::*;

        #[test]
        fn trim_span_strips_whitespace() {
            let content = "x :=  a + b  \n";
            assert_eq!(trim_span(content, Span::new(4, 13)), Span::new(6, 11));
        }

        #[test]
        fn trim_span_of_blank_text_is_empty() {
            assert_eq!(trim_span("a    b", Span::new(1, 5)), Span::new(1, 1));
        }

        #[test]
        fn line_bounds_cover_whole_lines() {
            let content = "one\ntwo three\nfour\n";
            assert_eq!(line_bounds(content, Span::new(8, 9)), Span::new(4, 14));
            assert_eq!(line_bounds(content, Span::new(0, 0)), Span::new(0, 4));
        }

        #[test]
        fn free_functions_agree_with_index() {
            let content = "package main\n\nfunc main() {}\n";
            assert_eq!(byte_offset_to_position(content, 14), (3, 1));
            assert_eq!(position_to_byte_offset(content, 3, 6), 19);
            assert_eq!(extract_span(content, &Span::new(14, 18)), Some("func"));
        }
    }
}
