//! Go refactoring operations framework.
//!
//! Provides the types every refactoring shares:
//! - [`Config`]: the file, the selection and the refactoring's arguments
//! - [`RefactoringResult`]: the log, edit sets per file and file-system changes
//! - [`Description`]: what a refactoring is called and which arguments it takes
//! - [`Refactoring`]: the trait the registry stores
//!
//! and the run lifecycle in [`RefactoringBase`]: seeding the log with the
//! program's own diagnostics, locating the selection, recording edits and
//! checking the edited files still parse.

pub mod extract_local;
pub mod rename;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gorefactor_core::{EditSet, FsChange, Log, Span};
use gorefactor_syntax::{parse_file, path_enclosing_interval, Ast, FileId, NodeId};

use crate::program::{normalize_path, Program, SourceFile};

pub use extract_local::ExtractLocal;
pub use rename::Rename;

// ============================================================================
// Configuration and Results
// ============================================================================

/// Input to one refactoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path of the file holding the selection, as registered in the program.
    pub file: String,
    /// Selected byte range in `file`.
    pub selection: Span,
    /// Refactoring-specific arguments, in the order of [`Description::params`].
    pub args: Vec<String>,
    /// Log informational entries about what the refactoring did.
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    pub fn new(file: impl Into<String>, selection: Span, args: Vec<String>) -> Self {
        Config {
            file: file.into(),
            selection,
            args,
            verbose: false,
        }
    }
}

/// Output of one refactoring run.
///
/// When the log contains a fatal error, `edits` and `fs_changes` are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefactoringResult {
    pub log: Log,
    /// Edit sets keyed by file path. Files without edits are absent.
    pub edits: BTreeMap<String, EditSet>,
    /// File-system changes to perform after the edits are written.
    pub fs_changes: Vec<FsChange>,
}

impl RefactoringResult {
    /// Total number of edits across all files.
    pub fn edit_count(&self) -> usize {
        self.edits.values().map(EditSet::len).sum()
    }
}

/// One argument a refactoring takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub label: String,
    pub prompt: String,
    pub default_value: String,
}

/// What a refactoring is called and how it is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    pub synopsis: String,
    pub usage: String,
    pub params: Vec<Parameter>,
    /// The refactoring may edit files other than the one with the selection.
    pub multifile: bool,
    /// Left out of listings unless asked for.
    pub hidden: bool,
}

/// A source-to-source transformation.
pub trait Refactoring {
    fn description(&self) -> Description;

    /// Run the refactoring against `program`.
    ///
    /// Never fails outright: problems are reported in the result's log, and
    /// a fatal entry means no edits were produced.
    fn run(&self, program: &Program, config: &Config) -> RefactoringResult;
}

// ============================================================================
// Run Lifecycle
// ============================================================================

/// State shared by every refactoring during one run.
pub(crate) struct RefactoringBase<'p> {
    pub program: &'p Program,
    /// File holding the selection, once found.
    pub file: Option<&'p SourceFile>,
    pub selection: Span,
    pub verbose: bool,
    /// Nodes enclosing the selection, from the file root inward.
    pub path: Vec<NodeId>,
    pub result: RefactoringResult,
}

impl<'p> RefactoringBase<'p> {
    /// Seed the log and locate the selection.
    ///
    /// Diagnostics the program already had are carried over as warnings so
    /// that unrelated problems elsewhere do not block the refactoring.
    pub fn start(program: &'p Program, config: &Config) -> Self {
        let mut base = RefactoringBase {
            program,
            file: None,
            selection: config.selection,
            verbose: config.verbose,
            path: Vec::new(),
            result: RefactoringResult::default(),
        };
        for entry in program.diagnostics() {
            base.result.log.push(entry.clone());
        }
        base.result.log.mark_initial();
        base.result.log.change_initial_errors_to_warnings();

        let Some(file) = program.file_by_path(&normalize_path(&config.file)) else {
            let message = if program.was_loaded(&config.file) {
                format!("The file {} could not be parsed", config.file)
            } else {
                format!("The file {} is not part of the program", config.file)
            };
            base.result.log.fatal(message);
            return base;
        };

        let selection = config.selection;
        let contents = &file.contents;
        if selection.end > contents.len()
            || !contents.is_char_boundary(selection.start)
            || !contents.is_char_boundary(selection.end)
        {
            base.result.log.fatal(format!(
                "The selection {} is outside of {} ({} bytes)",
                selection,
                file.path,
                contents.len()
            ));
            return base;
        }

        base.file = Some(file);
        base.path = path_enclosing_interval(program.ast(), file.root, contents, selection);
        base
    }

    /// Innermost node enclosing the selection.
    pub fn selected(&self) -> Option<NodeId> {
        self.path.last().copied()
    }

    /// Check if the run has already failed.
    pub fn failed(&self) -> bool {
        self.result.log.contains_errors()
    }

    /// Log a fatal error at the selection.
    pub fn fatal(&mut self, message: impl Into<String>) {
        let location = self.file.map(|f| f.location(self.selection));
        let entry = self.result.log.fatal(message);
        if let Some(location) = location {
            entry.at(location);
        }
    }

    /// Log an informational entry if the run is verbose.
    pub fn info(&mut self, message: impl Into<String>) {
        if self.verbose {
            self.result.log.info(message);
        }
    }

    /// Check the argument count against the description.
    pub fn validate_args(&mut self, config: &Config, description: &Description) -> bool {
        let expected = description.params.len();
        if config.args.len() == expected {
            return true;
        }
        self.fatal(format!(
            "This refactoring requires {} argument(s): {}",
            expected, description.usage
        ));
        false
    }

    /// Add an edit to `path`'s edit set, logging a fatal error if it
    /// overlaps an edit already there.
    pub fn add_edit(&mut self, path: &str, span: Span, replacement: impl Into<String>) -> bool {
        let edits = self.result.edits.entry(path.to_string()).or_default();
        match edits.add(span, replacement) {
            Ok(()) => true,
            Err(err) => {
                self.fatal(format!("Unable to edit {}: {}", path, err));
                false
            }
        }
    }

    /// Close the run and hand back the result.
    ///
    /// A fatal error discards all edits. Otherwise every edited file is
    /// parsed again, and syntax errors the edits introduced are logged.
    pub fn finish(mut self) -> RefactoringResult {
        self.result.edits.retain(|_, edits| !edits.is_empty());
        if self.result.log.contains_fatal() {
            self.result.edits.clear();
            self.result.fs_changes.clear();
            return self.result;
        }

        let mut problems = Vec::new();
        for (path, edits) in &self.result.edits {
            let Some(file) = self.program.file_by_path(path) else {
                continue;
            };
            let edited = match edits.apply(&file.contents) {
                Ok(edited) => edited,
                Err(err) => {
                    problems.push(format!("Unable to apply edits to {}: {}", path, err));
                    continue;
                }
            };
            if let Err(err) = parse_file(&mut Ast::new(), FileId::new(0), &edited) {
                problems.push(format!(
                    "The refactoring introduced a syntax error in {}: {}",
                    path, err.message
                ));
            }
        }
        for message in problems {
            self.result.log.error(message);
        }
        self.result
    }
}

// ============================================================================
// Tests
// ============================================================================
