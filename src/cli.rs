//! CLI front door helpers.
//!
//! The binary parses arguments and installs logging; everything it does with
//! them lives here so it can be tested without spawning a process:
//! - [`parse_pos`] turns `--pos` into a byte span
//! - [`run_refactoring`] loads the workspace and runs one refactoring
//! - [`render_diff`], [`render_json`] and [`write_changes`] emit the result
//! - [`render_error_json`] reports a failed run under `--json`
//!
//! ## Error Handling
//!
//! All functions return `Result<T, DoctorError>`. A refactoring that logs a
//! fatal error is not an error here; the caller decides what that means for
//! the exit code (see [`failure`]).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gorefactor_core::diff::unified_diff;
use gorefactor_core::error::{DoctorError, ErrorInfo};
use gorefactor_core::text::LineIndex;
use gorefactor_core::{EditSet, FsChange, LogEntry, Severity, Span};
use gorefactor_go::{Config, Program, RefactoringResult};
use serde::Serialize;
use tracing::{debug, info};

use crate::registry::Registry;

/// Version of the JSON envelope.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Requests
// ============================================================================

/// One refactoring invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Short name in the registry.
    pub refactoring: String,
    /// Workspace-relative path of the file holding the selection.
    pub file: String,
    /// Selection as given on the command line.
    pub pos: String,
    pub args: Vec<String>,
    pub verbose: bool,
}

/// A finished run, with the program it ran against.
#[derive(Debug)]
pub struct Outcome {
    pub program: Program,
    pub result: RefactoringResult,
}

/// Parse a `--pos` value against the contents of the selected file.
///
/// Accepted forms:
/// - `START` or `START,END`: byte offsets
/// - `LINE:COL` or `LINE:COL-LINE:COL`: 1-indexed positions
pub fn parse_pos(contents: &str, pos: &str) -> Result<Span, DoctorError> {
    let invalid = || {
        DoctorError::invalid_args(format!(
            "invalid position '{}', expected START[,END] or LINE:COL[-LINE:COL]",
            pos
        ))
    };

    let (start, end) = if pos.contains(':') {
        let index = LineIndex::new(contents);
        let resolve = |part: &str| -> Result<usize, DoctorError> {
            let (line, col) = part.split_once(':').ok_or_else(invalid)?;
            let line: u32 = line.trim().parse().map_err(|_| invalid())?;
            let col: u32 = col.trim().parse().map_err(|_| invalid())?;
            if line == 0 || col == 0 {
                return Err(invalid());
            }
            index.offset(line, col).ok_or_else(|| {
                DoctorError::invalid_args(format!("line {} is past the end of the file", line))
            })
        };
        match pos.split_once('-') {
            Some((start, end)) => (resolve(start)?, resolve(end)?),
            None => {
                let offset = resolve(pos)?;
                (offset, offset)
            }
        }
    } else {
        let parse = |part: &str| part.trim().parse::<usize>().map_err(|_| invalid());
        match pos.split_once(',') {
            Some((start, end)) => (parse(start)?, parse(end)?),
            None => {
                let offset = parse(pos)?;
                (offset, offset)
            }
        }
    };

    if start > end {
        return Err(DoctorError::invalid_args(format!(
            "position '{}' ends before it starts",
            pos
        )));
    }
    if end > contents.len() {
        return Err(DoctorError::invalid_args(format!(
            "position '{}' is past the end of the file ({} bytes)",
            pos,
            contents.len()
        )));
    }
    Ok(Span::new(start, end))
}

/// Load the workspace and run one registered refactoring.
pub fn run_refactoring(
    registry: &Registry,
    workspace: &Path,
    module: Option<&str>,
    request: &Request,
) -> Result<Outcome, DoctorError> {
    let refactoring =
        registry
            .get(&request.refactoring)
            .ok_or_else(|| DoctorError::UnknownRefactoring {
                name: request.refactoring.clone(),
            })?;

    let on_disk = workspace.join(&request.file);
    let contents = fs::read_to_string(&on_disk).map_err(|_| DoctorError::FileNotFound {
        path: request.file.clone(),
    })?;
    let selection = parse_pos(&contents, &request.pos)?;

    let program = Program::load_dir(workspace, module)?;
    debug!(
        files = program.files().len(),
        packages = program.packages().len(),
        "loaded workspace"
    );

    let mut config = Config::new(request.file.clone(), selection, request.args.clone());
    config.verbose = request.verbose;
    let result = refactoring.run(&program, &config);
    info!(
        refactoring = %request.refactoring,
        edits = result.edit_count(),
        fs_changes = result.fs_changes.len(),
        "refactoring finished"
    );
    Ok(Outcome { program, result })
}

/// The error to exit with when the log holds a fatal entry.
pub fn failure(result: &RefactoringResult) -> Option<DoctorError> {
    let fatal = result
        .log
        .refactoring_entries()
        .iter()
        .find(|entry| entry.severity == Severity::FatalError)?;
    Some(DoctorError::RefactoringFailed {
        message: fatal.message.clone(),
    })
}

// ============================================================================
// Output
// ============================================================================

/// Unified diff of every edited file, followed by the FS changes.
pub fn render_diff(outcome: &Outcome) -> Result<String, DoctorError> {
    let mut out = String::new();
    for (path, edits) in &outcome.result.edits {
        let original = original_contents(&outcome.program, path)?;
        out.push_str(&unified_diff(path, original, edits)?);
    }
    for change in &outcome.result.fs_changes {
        out.push_str(&format!("# {}\n", change));
    }
    Ok(out)
}

/// JSON envelope for a run.
#[derive(Debug, Serialize)]
pub struct RunResponse<'a> {
    pub status: &'static str,
    pub schema_version: &'static str,
    pub refactoring: &'a str,
    pub log: &'a [LogEntry],
    pub edits: &'a BTreeMap<String, EditSet>,
    pub fs_changes: &'a [FsChange],
}

pub fn render_json(refactoring: &str, result: &RefactoringResult) -> Result<String, DoctorError> {
    let response = RunResponse {
        status: if result.log.contains_fatal() {
            "error"
        } else {
            "ok"
        },
        schema_version: SCHEMA_VERSION,
        refactoring,
        log: result.log.entries(),
        edits: &result.edits,
        fs_changes: &result.fs_changes,
    };
    Ok(serde_json::to_string_pretty(&response)?)
}

/// JSON envelope for a run that failed before producing a result.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub schema_version: &'static str,
    pub error: ErrorInfo,
}

pub fn render_error_json(err: &DoctorError) -> Result<String, DoctorError> {
    let response = ErrorResponse {
        status: "error",
        schema_version: SCHEMA_VERSION,
        error: ErrorInfo::from_error(err),
    };
    Ok(serde_json::to_string_pretty(&response)?)
}

/// Write edited files, then perform the FS changes.
///
/// Returns a line per change made, for reporting.
pub fn write_changes(workspace: &Path, outcome: &Outcome) -> Result<Vec<String>, DoctorError> {
    // Compute every new text before touching the disk
    let mut updated = Vec::new();
    for (path, edits) in &outcome.result.edits {
        let original = original_contents(&outcome.program, path)?;
        let text = edits
            .apply(original)
            .map_err(|err| DoctorError::apply(err.to_string(), path.clone()))?;
        updated.push((path, text));
    }

    let mut report = Vec::new();
    for (path, text) in updated {
        let target = workspace.join(path);
        fs::write(&target, text).map_err(|err| {
            DoctorError::apply(format!("failed to write: {}", err), path.clone())
        })?;
        debug!(path = %path, "wrote file");
        report.push(format!("M {}", path));
    }

    for change in &outcome.result.fs_changes {
        match change {
            FsChange::Rename { from, to } => {
                let (source, target) = (workspace.join(from), workspace.join(to));
                rename_path(&source, &target)?;
                report.push(format!("R {} -> {}", from.display(), to.display()));
            }
        }
    }
    Ok(report)
}

fn rename_path(source: &Path, target: &Path) -> Result<(), DoctorError> {
    if target.exists() {
        return Err(DoctorError::apply(
            format!("{} already exists", target.display()),
            source.display().to_string(),
        ));
    }
    fs::rename(source, target).map_err(|err| {
        DoctorError::apply(
            format!("failed to rename to {}: {}", target.display(), err),
            source.display().to_string(),
        )
    })
}

fn original_contents<'p>(program: &'p Program, path: &str) -> Result<&'p str, DoctorError> {
    program
        .file_by_path(path)
        .map(|file| file.contents.as_str())
        .ok_or_else(|| DoctorError::internal(format!("edited file {} is not loaded", path)))
}

// ============================================================================
// Tests
// ============================================================================
