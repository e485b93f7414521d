//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Core Infrastructure Types
// ============================================================================

use gorefactor_core::change::FsChange;
use gorefactor_core::diff::unified_diff;
use gorefactor_core::edit::{Edit, EditError, EditSet, Span};
use gorefactor_core::error::{DoctorError, ErrorInfo, OutputErrorCode};
use gorefactor_core::log::{Location, Log, LogEntry, Severity};
use gorefactor_core::text;

// ============================================================================
// Go Engine
// ============================================================================

use gorefactor_go::ops::extract_local::Rejection;
use gorefactor_go::{
    validate_go_identifier, Config, Description, ExtractLocal, LoadError, Occurrences, Package,
    PackageId, Parameter, Position, Program, Refactoring, RefactoringResult, Rename,
    SearchEngine, SearchError, SearchTarget, SourceFile, ValidationError,
};

// ============================================================================
// Front Door
// ============================================================================

use gorefactor::cli::{
    failure, parse_pos, render_diff, render_error_json, render_json, run_refactoring,
    write_changes, ErrorResponse, Outcome, Request, RunResponse, SCHEMA_VERSION,
};
use gorefactor::registry::{Registry, RegistryError};

// ============================================================================
// Test
// ============================================================================

#[test]
fn api_surface_compiles() {
    let _ = std::any::type_name::<Span>();
    let _ = std::any::type_name::<EditSet>();
    let _ = std::any::type_name::<Log>();
    let _ = std::any::type_name::<Program>();
    let _ = std::any::type_name::<SearchEngine>();
    let _ = std::any::type_name::<DoctorError>();
    let _ = std::any::type_name::<Registry>();
    let _ = std::any::type_name::<Outcome>();
}

#[test]
fn schema_version_is_stable() {
    // The schema version is part of the public API contract
    assert_eq!(SCHEMA_VERSION, "1");
}
