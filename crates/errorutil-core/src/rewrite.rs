//! Span-exact source rewriting.
//!
//! An [`Edit`] replaces exactly one byte span. Before anything is replaced the
//! bytes currently at the span must equal the text recorded at extraction
//! time; any mismatch fails the whole file and leaves it untouched. Files are
//! replaced atomically (temp file in the same directory, then rename) and a
//! file whose content would not change is never written.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Span;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("span {span} is outside the file ({len} bytes)")]
    SpanOutOfBounds { span: Span, len: usize },

    /// The file changed since extraction.
    #[error("expected {expected:?} at {span}, found {actual:?}")]
    AnchorMismatch {
        span: Span,
        expected: String,
        actual: String,
    },

    #[error("edits at {first} and {second} overlap")]
    OverlappingEdits { first: Span, second: Span },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Edits
// ============================================================================

/// Replace `expected` at `span` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub expected: String,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, expected: impl Into<String>, replacement: impl Into<String>) -> Self {
        Edit {
            span,
            expected: expected.into(),
            replacement: replacement.into(),
        }
    }
}

/// Apply edits to content in memory.
///
/// All anchors are checked before any replacement, then edits are applied in
/// reverse offset order so earlier spans stay valid.
pub fn apply_edits(content: &str, edits: &[Edit]) -> Result<String, RewriteError> {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));

    for pair in sorted.windows(2) {
        if pair[0].span.overlaps(&pair[1].span) {
            return Err(RewriteError::OverlappingEdits {
                first: pair[0].span,
                second: pair[1].span,
            });
        }
    }

    for edit in &sorted {
        let actual = content.as_bytes().get(edit.span.start..edit.span.end).ok_or_else(|| {
            RewriteError::SpanOutOfBounds {
                span: edit.span,
                len: content.len(),
            }
        })?;
        if actual != edit.expected.as_bytes() {
            return Err(RewriteError::AnchorMismatch {
                span: edit.span,
                expected: edit.expected.clone(),
                actual: String::from_utf8_lossy(actual).into_owned(),
            });
        }
    }

    let mut out = content.to_string();
    for edit in sorted.iter().rev() {
        // Anchors matched whole UTF-8 text, so the span is on char boundaries.
        out.replace_range(edit.span.start..edit.span.end, &edit.replacement);
    }
    Ok(out)
}

/// Write `content` to `path` atomically, keeping the existing file's permissions.
///
/// The temp file lives in the target's directory so the final rename never
/// crosses filesystems. A crash leaves either the old or the new file, never a
/// partial one.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Apply edits to one file on disk. Returns whether the file was written.
pub fn rewrite_file(path: &Path, edits: &[Edit]) -> Result<bool, RewriteError> {
    let original = fs::read_to_string(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let updated = apply_edits(&original, edits)?;
    if updated == original {
        debug!(path = %path.display(), "no change, not rewriting");
        return Ok(false);
    }
    atomic_write(path, updated.as_bytes()).map_err(|source| RewriteError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

// ============================================================================
// Batch Rewriting
// ============================================================================

/// All edits destined for one file.
#[derive(Debug, Clone)]
pub struct FileRewrite {
    /// Root-relative path, for reports.
    pub rel_path: String,
    pub path: PathBuf,
    pub edits: Vec<Edit>,
}

#[derive(Debug, Default)]
pub struct RewriteOutcome {
    /// Files whose new content is on disk.
    pub committed: Vec<String>,
    /// Files whose edits were no-ops.
    pub unchanged: Vec<String>,
    pub failed: Vec<(String, RewriteError)>,
}

impl RewriteOutcome {
    /// Whether a file's edits are on disk (written or already identical).
    pub fn is_applied(&self, rel_path: &str) -> bool {
        self.committed.iter().chain(&self.unchanged).any(|p| p == rel_path)
    }
}

/// Rewrite many files in parallel. Each file has exactly one writer.
pub fn rewrite_all(rewrites: &[FileRewrite]) -> RewriteOutcome {
    let results: Vec<(String, Result<bool, RewriteError>)> = rewrites
        .par_iter()
        .map(|fr| (fr.rel_path.clone(), rewrite_file(&fr.path, &fr.edits)))
        .collect();

    let mut outcome = RewriteOutcome::default();
    for (rel_path, result) in results {
        match result {
            Ok(true) => outcome.committed.push(rel_path),
            Ok(false) => outcome.unchanged.push(rel_path),
            Err(err) => {
                warn!(file = %rel_path, error = %err, "rewrite failed");
                outcome.failed.push((rel_path, err));
            }
        }
    }
    outcome
}
