//! Edit sets: non-overlapping text replacements for a single file.
//!
//! An [`EditSet`] collects `(span, replacement)` pairs against a snapshot of
//! one file's original text:
//! - Edits are kept in ascending offset order
//! - Adding an edit that overlaps an existing one is rejected
//! - Applying never renumbers offsets mid-apply; every span refers to the
//!   original text
//!
//! Zero-length spans are insertions. An insertion may sit at the start or the
//! end of a replaced span, but two insertions at the same offset are
//! ambiguous and rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Create a span from an offset and a length.
    pub fn at(offset: usize, length: usize) -> Self {
        Span {
            start: offset,
            end: offset + length,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap. An
    /// empty span overlaps a non-empty one only when it lies strictly inside.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if the byte offset lies within `[start, end]`.
    ///
    /// The end is inclusive so that a cursor placed right after a token
    /// still selects it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Edits
// ============================================================================

/// Errors produced while building or applying an edit set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The new edit overlaps an edit already in the set.
    #[error("edit {new} overlaps existing edit {existing}")]
    Overlap { existing: Span, new: Span },

    /// An edit reaches past the end of the text it is applied to, or splits a
    /// UTF-8 character.
    #[error("edit {span} is out of bounds for text of length {len}")]
    OutOfBounds { span: Span, len: usize },
}

/// A single replacement: remove `span` from the original text and put
/// `replacement` in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Byte range removed from the original text.
    pub span: Span,
    /// Text inserted in place of the removed range.
    pub replacement: String,
}

impl Edit {
    /// Byte offset the edit starts at.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    /// Number of bytes removed.
    pub fn length(&self) -> usize {
        self.span.len()
    }

    fn conflicts_with(&self, span: &Span) -> bool {
        if self.span.is_empty() && span.is_empty() {
            return self.span.start == span.start;
        }
        self.span.overlaps(span)
    }
}

/// Ordered, non-overlapping collection of edits for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    /// Create an empty edit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edit replacing `span` with `replacement`.
    ///
    /// Fails without modifying the set if `span` overlaps an existing edit.
    pub fn add(&mut self, span: Span, replacement: impl Into<String>) -> Result<(), EditError> {
        if let Some(existing) = self.edits.iter().find(|e| e.conflicts_with(&span)) {
            return Err(EditError::Overlap {
                existing: existing.span,
                new: span,
            });
        }
        let key = (span.start, span.len());
        let index = self
            .edits
            .partition_point(|e| (e.span.start, e.span.len()) <= key);
        self.edits.insert(
            index,
            Edit {
                span,
                replacement: replacement.into(),
            },
        );
        Ok(())
    }

    /// The edits in ascending offset order.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Iterate over the edits in ascending offset order.
    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.edits.iter()
    }

    /// Number of edits in the set.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Check if the set has no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Net change in length (bytes) after applying the set.
    pub fn size_change(&self) -> isize {
        self.edits
            .iter()
            .map(|e| e.replacement.len() as isize - e.span.len() as isize)
            .sum()
    }

    /// Apply the edits to `original`, splicing replacements in ascending
    /// offset order.
    pub fn apply(&self, original: &str) -> Result<String, EditError> {
        for edit in &self.edits {
            if edit.span.end > original.len()
                || !original.is_char_boundary(edit.span.start)
                || !original.is_char_boundary(edit.span.end)
            {
                return Err(EditError::OutOfBounds {
                    span: edit.span,
                    len: original.len(),
                });
            }
        }

        let capacity = (original.len() as isize + self.size_change()).max(0) as usize;
        let mut out = String::with_capacity(capacity);
        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&original[cursor..edit.span.start]);
            out.push_str(&edit.replacement);
            cursor = edit.span.end;
        }
        out.push_str(&original[cursor..]);
        Ok(out)
    }
}

impl<'a> IntoIterator for &'a EditSet {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
