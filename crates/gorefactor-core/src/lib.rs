//! Core infrastructure for gorefactor.
//!
//! This crate provides language-agnostic infrastructure:
//! - Spans and per-file edit sets with overlap rejection
//! - The refactoring log (severities, positions, downgrade of pre-existing errors)
//! - File-system change requests produced alongside text edits
//! - Text utilities (line index, offset/position conversion)
//! - Unified diff rendering for edit sets
//! - The unified CLI error type and its stable exit codes

pub mod change;
pub mod diff;
pub mod edit;
pub mod error;
pub mod log;
pub mod text;

pub use change::FsChange;
pub use edit::{Edit, EditError, EditSet, Span};
pub use log::{Location, Log, LogEntry, Severity};
