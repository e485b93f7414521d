//! Error types and error code constants for the CLI.
//!
//! This module provides a unified error type (`DoctorError`) that bridges
//! domain-specific errors from the subsystems (loading, edit sets, the
//! registry) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (file not found, unknown refactoring)
//! - `4`: Apply errors (failed to apply changes)
//! - `5`: The refactoring refused to run (a fatal error was logged)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Refactoring-level problems are not errors in this sense: a refactoring
//! that rejects a selection still returns normally, with the reason in its
//! log. `RefactoringFailed` only exists so the CLI can turn such a log into
//! an exit code.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::edit::EditError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (file not found, unknown refactoring).
    ResolutionError = 3,
    /// Apply errors (failed to write changes, overlapping edits).
    ApplyError = 4,
    /// The refactoring logged a fatal error.
    RefactoringFailed = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum DoctorError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// File not found in the workspace or program.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// No refactoring registered under the requested name.
    #[error("unknown refactoring '{name}'")]
    UnknownRefactoring { name: String },

    /// Failed to apply changes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// The refactoring logged a fatal error.
    #[error("refactoring failed: {message}")]
    RefactoringFailed { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&DoctorError> for OutputErrorCode {
    fn from(err: &DoctorError) -> Self {
        match err {
            DoctorError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DoctorError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            DoctorError::UnknownRefactoring { .. } => OutputErrorCode::ResolutionError,
            DoctorError::ApplyError { .. } => OutputErrorCode::ApplyError,
            DoctorError::RefactoringFailed { .. } => OutputErrorCode::RefactoringFailed,
            DoctorError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<EditError> for DoctorError {
    fn from(err: EditError) -> Self {
        DoctorError::ApplyError {
            message: err.to_string(),
            file: None,
        }
    }
}

impl From<std::io::Error> for DoctorError {
    fn from(err: std::io::Error) -> Self {
        DoctorError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for DoctorError {
    fn from(err: serde_json::Error) -> Self {
        DoctorError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl DoctorError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DoctorError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an apply error for a specific file.
    pub fn apply(message: impl Into<String>, file: impl Into<String>) -> Self {
        DoctorError::ApplyError {
            message: message.into(),
            file: Some(file.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DoctorError::InternalError {
            message: message.into(),
        }
    }

    /// The exit code for this error.
    pub fn code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

/// Error information for JSON error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a `DoctorError`.
    pub fn from_error(err: &DoctorError) -> Self {
        let details = match err {
            DoctorError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            DoctorError::UnknownRefactoring { name } => Some(serde_json::json!({ "name": name })),
            DoctorError::ApplyError {
                file: Some(file), ..
            } => Some(serde_json::json!({ "file": file })),
            _ => None,
        };
        ErrorInfo {
            code: err.code().code(),
            message: err.to_string(),
            details,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
