//! gorefactor - refactoring engine for Go source.
//!
//! This crate provides the registry of refactorings and the CLI front door.
//! The engine itself lives in the workspace crates:
//! - `gorefactor-core`: spans, edit sets, the log, FS changes, diffs, errors
//! - `gorefactor-syntax`: the Go tokenizer, parser and AST
//! - `gorefactor-go`: the program model, search engine and refactorings
//!
//! ## Modules
//!
//! - `registry` - refactorings by short name
//! - `cli` - CLI command implementations

pub mod cli;
pub mod registry;

// Re-export core types for convenience
pub use gorefactor_core::error::{DoctorError, ErrorInfo, OutputErrorCode};
pub use gorefactor_go::{Config, Description, Program, Refactoring, RefactoringResult};
pub use registry::{Registry, RegistryError};
