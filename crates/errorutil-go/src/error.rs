//! Parse errors for Go sources.

use errorutil_core::text::LineIndex;
use thiserror::Error;

/// A file is not syntactically valid Go.
///
/// Carries a 1-indexed position; the file path is added by the walker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub col: u32,
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    /// Build an error at byte `offset` of `src`.
    pub fn at(src: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::at_indexed(&LineIndex::new(src), offset, message)
    }

    /// Like [`ParseError::at`] with a prebuilt line index.
    pub fn at_indexed(index: &LineIndex, offset: usize, message: impl Into<String>) -> Self {
        let (line, col) = index.position(offset);
        ParseError {
            line,
            col,
            offset,
            message: message.into(),
        }
    }
}
