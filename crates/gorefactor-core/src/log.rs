//! The refactoring log: an ordered list of diagnostics.
//!
//! Every refactoring run records what it found in a [`Log`]. Entries logged
//! while the program was being loaded describe problems that existed before
//! the refactoring started; [`Log::mark_initial`] fences them off so that
//! [`Log::change_initial_errors_to_warnings`] can downgrade them without
//! touching anything the refactoring itself reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edit::Span;

/// Severity of a log entry, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational message.
    Info,
    /// Something the user should look at; the refactoring still proceeds.
    Warning,
    /// The result is probably wrong.
    Error,
    /// The refactoring cannot proceed; no edits are produced.
    FatalError,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::FatalError => "Fatal Error",
        };
        f.write_str(label)
    }
}

/// Source position attached to a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as registered in the program.
    pub file: String,
    /// Byte range the entry refers to.
    pub span: Span,
    /// 1-indexed line of `span.start`.
    pub line: u32,
    /// 1-indexed column of `span.start`.
    pub col: u32,
}

impl Location {
    /// Create a location.
    pub fn new(file: impl Into<String>, span: Span, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            span,
            line,
            col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// How serious the entry is.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Where the problem is, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Location>,
}

impl LogEntry {
    /// Attach a source position to this entry.
    pub fn at(&mut self, location: Location) -> &mut Self {
        self.position = Some(location);
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(f, "{}: {}: {}", pos, self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Ordered list of diagnostics for a single refactoring run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    entries: Vec<LogEntry>,
    #[serde(skip)]
    initial: usize,
}

impl Log {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return it so a position can be attached.
    pub fn log(&mut self, severity: Severity, message: impl Into<String>) -> &mut LogEntry {
        let index = self.entries.len();
        self.entries.push(LogEntry {
            severity,
            message: message.into(),
            position: None,
        });
        &mut self.entries[index]
    }

    /// Append an entry built elsewhere, such as a load diagnostic.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Append an informational entry.
    pub fn info(&mut self, message: impl Into<String>) -> &mut LogEntry {
        self.log(Severity::Info, message)
    }

    /// Append a warning.
    pub fn warn(&mut self, message: impl Into<String>) -> &mut LogEntry {
        self.log(Severity::Warning, message)
    }

    /// Append an error.
    pub fn error(&mut self, message: impl Into<String>) -> &mut LogEntry {
        self.log(Severity::Error, message)
    }

    /// Append a fatal error.
    pub fn fatal(&mut self, message: impl Into<String>) -> &mut LogEntry {
        self.log(Severity::FatalError, message)
    }

    /// Record that every entry logged so far predates the refactoring.
    pub fn mark_initial(&mut self) {
        self.initial = self.entries.len();
    }

    /// Downgrade errors logged before [`Log::mark_initial`] to warnings.
    pub fn change_initial_errors_to_warnings(&mut self) {
        for entry in self.entries.iter_mut().take(self.initial) {
            if entry.severity > Severity::Warning {
                entry.severity = Severity::Warning;
            }
        }
    }

    /// True if any entry is an error or a fatal error.
    pub fn contains_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity >= Severity::Error)
    }

    /// True if any entry is a fatal error.
    pub fn contains_fatal(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.severity == Severity::FatalError)
    }

    /// All entries in the order they were logged.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries logged after [`Log::mark_initial`].
    pub fn refactoring_entries(&self) -> &[LogEntry] {
        &self.entries[self.initial.min(self.entries.len())..]
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
