//! Text position utilities for byte offset to line:column conversion.
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count bytes, which is what Go tooling reports as well

use crate::types::Location;

/// Precomputed line starts for repeated offset lookups in one file.
///
/// Extraction resolves a location for every declaration and detail call, so
/// a linear scan per lookup would be quadratic on large error files.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            line_starts,
            len: content.len(),
        }
    }

    /// 1-indexed `(line, col)` for a byte offset.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let col = offset - self.line_starts[line_idx] + 1;
        ((line_idx + 1) as u32, col as u32)
    }

    /// Build a [`Location`] for `offset` in `file`.
    pub fn location(&self, file: &str, offset: usize) -> Location {
        let (line, col) = self.position(offset);
        Location::new(file, line, col)
    }
}
