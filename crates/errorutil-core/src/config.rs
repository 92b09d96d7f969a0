//! Run configuration and the error declaration convention.
//!
//! [`ConventionConfig`] captures everything that defines a "compatible" error:
//! the code naming pattern, the placeholder value, and the detail-construction
//! callee. [`RunConfig`] captures the directories and mode of one invocation.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::assign::AssignPolicy;

/// Tool name, used as the prefix for every produced artifact.
pub const APP: &str = "errorutil";

/// Canonical placeholder a developer writes before a code is assigned.
pub const DEFAULT_PLACEHOLDER: &str = "replace_me";

/// Required shape of an error code identifier.
pub const DEFAULT_CODE_NAME_PATTERN: &str = r"^Err[A-Z].+Code$";

/// Directories that are never descended into, in addition to user skips.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[".git", "vendor", "node_modules", "testdata"];

static DEFAULT_CODE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_CODE_NAME_PATTERN).unwrap());

// ============================================================================
// Convention
// ============================================================================

/// The declaration convention enforced by the validator.
#[derive(Debug, Clone)]
pub struct ConventionConfig {
    /// Sentinel string value replaced by the assignment engine.
    pub placeholder: String,
    /// Error code identifiers must match this pattern.
    pub code_name: Regex,
    /// Package qualifier of the detail-construction function (`errors` in `errors.New`).
    pub detail_package: String,
    /// Name of the detail-construction function (`New` in `errors.New`).
    pub detail_function: String,
    /// Expected argument count: code, severity, and four description lists.
    pub detail_arity: usize,
}

impl Default for ConventionConfig {
    fn default() -> Self {
        ConventionConfig {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            code_name: DEFAULT_CODE_NAME_REGEX.clone(),
            detail_package: "errors".to_string(),
            detail_function: "New".to_string(),
            detail_arity: 6,
        }
    }
}

impl ConventionConfig {
    /// Whether `name` follows the error code naming convention.
    pub fn is_code_name(&self, name: &str) -> bool {
        self.code_name.is_match(name)
    }

    /// Whether `package.function` names the detail-construction function.
    pub fn is_detail_callee(&self, package: &str, function: &str) -> bool {
        package == self.detail_package && function == self.detail_function
    }

    /// Display form of the detail-construction callee, e.g. `errors.New`.
    pub fn detail_callee(&self) -> String {
        format!("{}.{}", self.detail_package, self.detail_function)
    }

    /// Whether a description statement is capitalized.
    ///
    /// Only a leading letter is checked: statements starting with a digit,
    /// quote or other non-letter have no case to enforce.
    pub fn is_capitalized(&self, statement: &str) -> bool {
        match statement.chars().next() {
            Some(c) if c.is_alphabetic() => c.is_uppercase(),
            _ => true,
        }
    }
}

// ============================================================================
// Run Configuration
// ============================================================================

/// What one invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read-only: extract, validate, export.
    Analyze,
    /// Assign codes and rewrite sources before exporting.
    Update(AssignPolicy),
}

/// Configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the source tree to scan.
    pub root_dir: PathBuf,
    /// Where the three JSON artifacts are written.
    pub out_dir: PathBuf,
    /// Directory holding `component_info.json`.
    pub info_dir: PathBuf,
    /// Directory names or root-relative paths to skip.
    pub skip_dirs: Vec<String>,
    /// Follow symbolic links while walking (loops are reported per path).
    pub follow_links: bool,
    pub mode: Mode,
    pub conventions: ConventionConfig,
}

impl RunConfig {
    /// Create a config rooted at `root_dir`; output and info dirs default to the root.
    pub fn new(root_dir: impl Into<PathBuf>, mode: Mode) -> Self {
        let root_dir = root_dir.into();
        RunConfig {
            out_dir: root_dir.clone(),
            info_dir: root_dir.clone(),
            root_dir,
            skip_dirs: Vec::new(),
            follow_links: false,
            mode,
            conventions: ConventionConfig::default(),
        }
    }

    /// Override the output directory. An empty path keeps the root default.
    pub fn with_out_dir(mut self, dir: Option<impl AsRef<Path>>) -> Self {
        if let Some(dir) = non_empty(dir) {
            self.out_dir = dir;
        }
        self
    }

    /// Override the component metadata directory. An empty path keeps the root default.
    pub fn with_info_dir(mut self, dir: Option<impl AsRef<Path>>) -> Self {
        if let Some(dir) = non_empty(dir) {
            self.info_dir = dir;
        }
        self
    }

    /// Add skip entries. Comma-separated values are split.
    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in dirs {
            self.skip_dirs.extend(
                entry
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }
        self
    }

    /// Effective skip list: defaults plus user entries, deduplicated.
    pub fn effective_skip_dirs(&self) -> Vec<String> {
        let set: BTreeSet<String> = DEFAULT_SKIP_DIRS
            .iter()
            .map(|s| s.to_string())
            .chain(self.skip_dirs.iter().cloned())
            .collect();
        set.into_iter().collect()
    }
}

fn non_empty(dir: Option<impl AsRef<Path>>) -> Option<PathBuf> {
    dir.map(|d| d.as_ref().to_path_buf())
        .filter(|d| !d.as_os_str().is_empty())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod conventions {
        use super::*;

        #[test]
        fn code_name_pattern() {
            let conv = ConventionConfig::default();
            assert!(conv.is_code_name("ErrApplyManifestCode"));
            assert!(conv.is_code_name("ErrXyCode"));
            assert!(!conv.is_code_name("ErrXCode"));
            assert!(!conv.is_code_name("ErrCode"), "needs at least one char after the capital");
            assert!(!conv.is_code_name("errApplyCode"));
            assert!(!conv.is_code_name("ErrapplyCode"));
            assert!(!conv.is_code_name("ErrApplyCodes"));
            assert!(!conv.is_code_name("ErrApply"));
        }

        #[test]
        fn detail_callee_matches_package_and_function() {
            let conv = ConventionConfig::default();
            assert!(conv.is_detail_callee("errors", "New"));
            assert!(!conv.is_detail_callee("fmt", "New"));
            assert!(!conv.is_detail_callee("errors", "Wrap"));
            assert_eq!(conv.detail_callee(), "errors.New");
        }

        #[test]
        fn capitalization_only_checks_letters() {
            let conv = ConventionConfig::default();
            assert!(conv.is_capitalized("Unable to apply manifest"));
            assert!(!conv.is_capitalized("unable to apply manifest"));
            assert!(conv.is_capitalized("404 returned by server"));
            assert!(conv.is_capitalized(""));
            assert!(conv.is_capitalized("Éclair"));
            assert!(!conv.is_capitalized("éclair"));
        }
    }

    mod run_config {
        use super::*;

        #[test]
        fn out_and_info_default_to_root() {
            let cfg = RunConfig::new("/src/tree", Mode::Analyze)
                .with_out_dir(None::<&str>)
                .with_info_dir(Some(""));
            assert_eq!(cfg.out_dir, PathBuf::from("/src/tree"));
            assert_eq!(cfg.info_dir, PathBuf::from("/src/tree"));
        }

        #[test]
        fn explicit_dirs_override_root() {
            let cfg = RunConfig::new("/src/tree", Mode::Analyze)
                .with_out_dir(Some("/out"))
                .with_info_dir(Some("/info"));
            assert_eq!(cfg.out_dir, PathBuf::from("/out"));
            assert_eq!(cfg.info_dir, PathBuf::from("/info"));
        }

        #[test]
        fn skip_dirs_split_commas_and_merge_defaults() {
            let cfg = RunConfig::new(".", Mode::Analyze)
                .with_skip_dirs(["docs, build", "hack"])
                .with_skip_dirs(["vendor"]);
            assert_eq!(cfg.skip_dirs, vec!["docs", "build", "hack", "vendor"]);
            let effective = cfg.effective_skip_dirs();
            assert!(effective.contains(&".git".to_string()));
            assert_eq!(
                effective.iter().filter(|d| d.as_str() == "vendor").count(),
                1
            );
        }
    }
}
