//! Go refactoring engine for gorefactor.
//!
//! This crate provides Go-specific refactoring support:
//! - [`program`]: loading files into packages, the source map, diagnostics
//! - [`types`]: objects, scopes and the types the resolver tracks
//! - [`search`]: mapping an identifier to every occurrence of its entity
//! - [`ops`]: the refactoring lifecycle, Rename and Extract-Local-Variable
//! - [`validation`]: identifier checks for user-supplied names
//!
//! A [`Program`] is built once and shared read-only by every refactoring:
//!
//! ```
//! use gorefactor_core::Span;
//! use gorefactor_go::{Config, Program, Refactoring, Rename};
//!
//! let source = "package main\n\nfunc main() {\n\tn := 1\n\t_ = n\n}\n";
//! let program = Program::load(vec![("main.go".to_string(), source.to_string())]);
//!
//! let start = source.find("n :=").unwrap();
//! let config = Config::new("main.go", Span::at(start, 1), vec!["count".to_string()]);
//! let result = Rename.run(&program, &config);
//!
//! assert!(!result.log.contains_errors());
//! assert_eq!(result.edit_count(), 2);
//! ```

pub mod ops;
pub mod program;
mod resolve;
pub mod search;
pub mod types;
pub mod validation;

pub use ops::{
    Config, Description, ExtractLocal, Parameter, Refactoring, RefactoringResult, Rename,
};
pub use program::{LoadError, Package, PackageId, Position, Program, SourceFile};
pub use search::{Occurrences, SearchEngine, SearchError, SearchTarget};
pub use validation::{validate_go_identifier, ValidationError};
