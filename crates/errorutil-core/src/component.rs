//! Component metadata and the next-free code counter.
//!
//! A component is the namespace within which error codes are unique. Its
//! record lives in `component_info.json` next to (or apart from) the source
//! tree:
//!
//! ```json
//! { "name": "meshkit", "type": "library", "next_error_code": 11000 }
//! ```
//!
//! The record is the only durable state the tool owns. It is read once per
//! run, and written back at most once, after rewriting, and only when the
//! counter actually advanced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::rewrite::atomic_write;

/// File name of the component record inside the info directory.
pub const COMPONENT_INFO_FILE: &str = "component_info.json";

// ============================================================================
// Errors
// ============================================================================

/// Errors loading or saving component metadata.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// No record exists where one is required.
    #[error("component metadata not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read component metadata {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse component metadata {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Structurally valid JSON with unusable contents.
    #[error("invalid component metadata {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to write component metadata {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Refused to move the counter backwards.
    #[error("next_error_code may only increase (current {current}, requested {requested})")]
    CounterRegression { current: u64, requested: u64 },
}

impl ComponentError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ComponentError::NotFound { path }
            | ComponentError::Read { path, .. }
            | ComponentError::Parse { path, .. }
            | ComponentError::Invalid { path, .. }
            | ComponentError::Write { path, .. } => Some(path),
            ComponentError::CounterRegression { .. } => None,
        }
    }
}

// ============================================================================
// Component Record
// ============================================================================

/// The persisted component record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub next_error_code: u64,
    /// Any other keys in the file, carried through unchanged on save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ComponentInfo {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>, next: u64) -> Self {
        ComponentInfo {
            name: name.into(),
            component_type: component_type.into(),
            next_error_code: next,
            extra: BTreeMap::new(),
        }
    }
}

/// Loaded component record bound to its file.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    path: PathBuf,
    info: ComponentInfo,
}

impl ComponentRegistry {
    /// Path of the record inside `info_dir`.
    pub fn file_path(info_dir: &Path) -> PathBuf {
        info_dir.join(COMPONENT_INFO_FILE)
    }

    /// Load the record from `info_dir`.
    ///
    /// A missing file is `Ok(None)`: analysis works without metadata, and the
    /// caller decides when absence is fatal. An unreadable or malformed file is
    /// always an error.
    pub fn load(info_dir: &Path) -> Result<Option<Self>, ComponentError> {
        let path = Self::file_path(info_dir);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no component metadata");
                return Ok(None);
            }
            Err(source) => return Err(ComponentError::Read { path, source }),
        };
        let info: ComponentInfo = serde_json::from_str(&text)
            .map_err(|source| ComponentError::Parse {
                path: path.clone(),
                source,
            })?;
        if info.name.trim().is_empty() {
            return Err(ComponentError::Invalid {
                path,
                reason: "\"name\" must not be empty".to_string(),
            });
        }
        debug!(
            component = %info.name,
            next_error_code = info.next_error_code,
            "loaded component metadata"
        );
        Ok(Some(ComponentRegistry { path, info }))
    }

    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn next_error_code(&self) -> u64 {
        self.info.next_error_code
    }

    /// A fresh single-owner counter starting at the persisted value.
    pub fn counter(&self) -> CodeCounter {
        CodeCounter::new(self.info.next_error_code)
    }

    /// Persist a new next-free code.
    ///
    /// Returns `Ok(false)` without touching the file when `next` equals the
    /// current value. Moving the counter backwards is refused.
    pub fn commit(&mut self, next: u64) -> Result<bool, ComponentError> {
        let current = self.info.next_error_code;
        if next == current {
            return Ok(false);
        }
        if next < current {
            return Err(ComponentError::CounterRegression {
                current,
                requested: next,
            });
        }

        let mut updated = self.info.clone();
        updated.next_error_code = next;
        let mut text = serde_json::to_string_pretty(&updated).map_err(|e| {
            ComponentError::Write {
                path: self.path.clone(),
                source: io::Error::other(e),
            }
        })?;
        text.push('\n');
        atomic_write(&self.path, text.as_bytes()).map_err(|source| ComponentError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!(
            component = %updated.name,
            from = current,
            to = next,
            "advanced next_error_code"
        );
        self.info = updated;
        Ok(true)
    }
}

// ============================================================================
// Counter
// ============================================================================

/// In-memory next-free code handle.
///
/// Owned by exactly one assignment pass and passed by `&mut`; the persisted
/// record is only updated through [`ComponentRegistry::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCounter {
    next: u64,
}

impl CodeCounter {
    pub fn new(next: u64) -> Self {
        CodeCounter { next }
    }

    /// Take the next code. `None` on `u64` exhaustion.
    pub fn allocate(&mut self) -> Option<u64> {
        let code = self.next;
        self.next = self.next.checked_add(1)?;
        Some(code)
    }

    /// The value the counter would persist now.
    pub fn peek(&self) -> u64 {
        self.next
    }
}
