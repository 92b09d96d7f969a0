//! Unified error type and process exit codes.
//!
//! Subsystem errors (`WalkError`, `ComponentError`, `RewriteError`,
//! `ExportError`, `AssignError`) are bridged into [`ErrorUtilError`], and every
//! variant maps to a stable [`OutputErrorCode`].
//!
//! ## Exit codes
//!
//! - `1`: Convention violations present (CI gate, not a process failure)
//! - `2`: Invalid arguments
//! - `3`: Per-file failures occurred (partial failure)
//! - `4`: Component metadata missing or unusable
//! - `5`: Counter and rewritten sources disagree
//! - `10`: Internal or fatal I/O errors
//!
//! Violations and per-file failures are reported through
//! [`RunStatus`](crate::pipeline::RunStatus) rather than raised, so one bad file
//! never hides the rest of the tree.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::assign::AssignError;
use crate::component::ComponentError;
use crate::export::ExportError;
use crate::walker::WalkError;

// ============================================================================
// Output Error Codes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Convention violations were found.
    Violations = 1,
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// Some files could not be read, parsed or rewritten.
    FileErrors = 3,
    /// Component metadata missing, unreadable or malformed.
    ComponentError = 4,
    /// The persisted counter does not match what was written to disk.
    CounterInconsistent = 5,
    /// Internal errors and fatal I/O.
    InternalError = 10,
}

impl OutputErrorCode {
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

#[derive(Debug, Error)]
pub enum ErrorUtilError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("cannot read root directory {path}: {message}")]
    RootUnreadable { path: PathBuf, message: String },

    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Sources were rewritten but the counter could not be persisted.
    #[error(
        "counter inconsistent: codes {first}..={last} were written to {files} file(s) \
         but next_error_code could not be advanced to {expected_next}: {message}"
    )]
    CounterInconsistent {
        first: u64,
        last: u64,
        files: usize,
        expected_next: u64,
        message: String,
    },

    #[error("failed to write artifact {path}: {message}")]
    ArtifactWrite { path: PathBuf, message: String },

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl ErrorUtilError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ErrorUtilError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ErrorUtilError::InternalError {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

impl From<&ErrorUtilError> for OutputErrorCode {
    fn from(err: &ErrorUtilError) -> Self {
        match err {
            ErrorUtilError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ErrorUtilError::RootUnreadable { .. } => OutputErrorCode::InternalError,
            ErrorUtilError::Component(ComponentError::Write { .. }) => {
                OutputErrorCode::InternalError
            }
            ErrorUtilError::Component(_) => OutputErrorCode::ComponentError,
            ErrorUtilError::CounterInconsistent { .. } => OutputErrorCode::CounterInconsistent,
            ErrorUtilError::ArtifactWrite { .. } => OutputErrorCode::InternalError,
            ErrorUtilError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ErrorUtilError> for OutputErrorCode {
    fn from(err: ErrorUtilError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<WalkError> for ErrorUtilError {
    fn from(err: WalkError) -> Self {
        match err {
            WalkError::RootUnreadable { path, source } => ErrorUtilError::RootUnreadable {
                path,
                message: source.to_string(),
            },
            WalkError::Entry { path, message } => ErrorUtilError::InternalError {
                message: format!("walk failed at {}: {}", path, message),
            },
        }
    }
}

impl From<ExportError> for ErrorUtilError {
    fn from(err: ExportError) -> Self {
        ErrorUtilError::ArtifactWrite {
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<AssignError> for ErrorUtilError {
    fn from(err: AssignError) -> Self {
        ErrorUtilError::InternalError {
            message: err.to_string(),
        }
    }
}
