//! Source tree walking with skip lists.
//!
//! The walk is lazy and restartable: every call to [`TreeWalker::files`]
//! starts a fresh traversal. Skipped directories are pruned before descent,
//! so nothing beneath them is ever read. Errors on individual entries
//! (permission denied, symlink loops) are yielded in-stream and never end the
//! walk; only an unreadable root is fatal, and that is checked up front.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum WalkError {
    /// The root cannot be listed. Fatal for the whole run.
    #[error("cannot read root directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One entry failed. Reported and skipped.
    #[error("cannot walk {path}: {message}")]
    Entry { path: String, message: String },
}

// ============================================================================
// Walker
// ============================================================================

/// A regular file found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Absolute (or root-joined) path for reading.
    pub path: PathBuf,
    /// Root-relative path with forward slashes, used in every report.
    pub rel_path: String,
}

#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    skip: BTreeSet<String>,
    follow_links: bool,
}

impl TreeWalker {
    /// Create a walker, verifying the root can be listed.
    ///
    /// `skip` entries without a `/` match any directory with that name; entries
    /// with a `/` match a root-relative directory path.
    pub fn new<I, S>(root: impl Into<PathBuf>, skip: I) -> Result<Self, WalkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.into();
        if let Err(source) = fs::read_dir(&root) {
            return Err(WalkError::RootUnreadable { path: root, source });
        }
        let skip = skip
            .into_iter()
            .map(|s| s.as_ref().trim_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(TreeWalker {
            root,
            skip,
            follow_links: false,
        })
    }

    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Iterate all regular files, in sorted order, pruning skipped directories.
    pub fn files(&self) -> impl Iterator<Item = Result<WalkedFile, WalkError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_skipped(entry))
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        Some(Ok(WalkedFile {
                            rel_path: relative_path(&self.root, entry.path()),
                            path: entry.into_path(),
                        }))
                    } else {
                        None
                    }
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| relative_path(&self.root, p))
                        .unwrap_or_else(|| ".".to_string());
                    Some(Err(WalkError::Entry {
                        path,
                        message: err.to_string(),
                    }))
                }
            })
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if self.skip.contains(name.as_ref()) {
            return true;
        }
        let rel = relative_path(&self.root, entry.path());
        self.skip.contains(&rel)
    }
}

/// Root-relative path with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Root-relative directory of a root-relative file path (`.` for top level).
pub fn parent_dir(rel_path: &str) -> &str {
    match rel_path.rfind('/') {
        Some(idx) => &rel_path[..idx],
        None => ".",
    }
}
