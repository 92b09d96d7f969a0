//! Language adapter trait and per-file extraction results.
//!
//! The engine never looks at source grammar directly. A [`LanguageAdapter`]
//! turns one file's text into a [`FileExtraction`]: the error code
//! declarations it found, the detail-construction calls it found, and the
//! style violations it could decide locally.
//!
//! # Responsibilities
//!
//! - **Adapters** parse, match declarations against [`ConventionConfig`], check
//!   detail call arguments, and record exact literal spans.
//! - **The engine** binds details to declarations across files of a package,
//!   validates across the component, assigns codes and rewrites spans.
//!
//! Adapters must be deterministic: the same content yields the same
//! extraction, in source order.

use std::path::Path;

use crate::config::ConventionConfig;
use crate::model::{ErrorDeclaration, ErrorDetail, Violation};

/// Everything one file contributes to a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileExtraction {
    /// Package clause of the file.
    pub package: String,
    /// Code declarations in source order.
    pub declarations: Vec<ErrorDeclaration>,
    /// Detail-construction calls in source order, not yet bound.
    pub details: Vec<ErrorDetail>,
    /// Style violations decided from this file alone.
    pub violations: Vec<Violation>,
}

impl FileExtraction {
    pub fn new(package: impl Into<String>) -> Self {
        FileExtraction {
            package: package.into(),
            ..Default::default()
        }
    }

    /// Whether the file contributes nothing to the report.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.details.is_empty() && self.violations.is_empty()
    }
}

/// Pluggable source matcher.
///
/// `Send + Sync` is required because extraction runs on a thread pool.
pub trait LanguageAdapter: Send + Sync {
    /// The error type for this adapter. Errors are per-file and never abort a walk.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Human-readable language name, for logs.
    fn language(&self) -> &'static str;

    /// Whether a walked file is a candidate for this adapter.
    fn can_handle(&self, path: &Path) -> bool;

    /// Extract declarations, details and local violations from one file.
    ///
    /// `path` is root-relative with forward slashes and is copied into every
    /// produced record and location.
    fn extract(
        &self,
        path: &str,
        content: &str,
        conventions: &ConventionConfig,
    ) -> Result<FileExtraction, Self::Error>;
}
