//! Unified diff generation for edit sets.
//!
//! Edits whose lines touch are coalesced into a single hunk; each hunk shows
//! the full original lines and the same lines after the edits are spliced
//! in. No extra context lines are emitted.

use crate::edit::{EditError, EditSet, Span};
use crate::text::{line_bounds, LineIndex};

/// Render the changes `edits` makes to `original` as a unified diff.
///
/// Returns an empty string for an empty edit set.
pub fn unified_diff(path: &str, original: &str, edits: &EditSet) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(String::new());
    }

    // Group edits into hunks of touching lines
    let mut hunks: Vec<(Span, EditSet)> = Vec::new();
    for edit in edits {
        if edit.span.end > original.len() {
            return Err(EditError::OutOfBounds {
                span: edit.span,
                len: original.len(),
            });
        }
        let bounds = line_bounds(original, edit.span);
        match hunks.last_mut() {
            Some((hunk, members)) if bounds.start < hunk.end => {
                hunk.end = hunk.end.max(bounds.end);
                members.add(shift(edit.span, hunk.start), edit.replacement.clone())?;
            }
            _ => {
                let mut members = EditSet::new();
                members.add(shift(edit.span, bounds.start), edit.replacement.clone())?;
                hunks.push((bounds, members));
            }
        }
    }

    let index = LineIndex::new(original);
    let mut out = format!("--- a/{}\n+++ b/{}\n", path, path);
    let mut line_delta: i64 = 0;
    for (bounds, members) in hunks {
        let old_text = &original[bounds.start..bounds.end];
        let new_text = members.apply(old_text)?;
        let old_lines: Vec<&str> = old_text.lines().collect();
        let new_lines: Vec<&str> = new_text.lines().collect();
        let old_start = index.line(bounds.start) as i64;
        let new_start = old_start + line_delta;

        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start,
            old_lines.len(),
            new_start,
            new_lines.len()
        ));
        for line in &old_lines {
            out.push_str(&format!("-{}\n", line));
        }
        if !old_text.ends_with('\n') && !old_lines.is_empty() {
            out.push_str("\\ No newline at end of file\n");
        }
        for line in &new_lines {
            out.push_str(&format!("+{}\n", line));
        }
        if !new_text.ends_with('\n') && !new_lines.is_empty() {
            out.push_str("\\ No newline at end of file\n");
        }
        line_delta += new_lines.len() as i64 - old_lines.len() as i64;
    }
    Ok(out)
}

fn shift(span: Span, base: usize) -> Span {
    Span::new(span.start - base, span.end - base)
}

// ============================================================================
// Tests
// ============================================================================
