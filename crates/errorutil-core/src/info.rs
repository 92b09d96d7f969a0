//! The per-walk snapshot: component → package → file.
//!
//! `InfoAll` is built fresh by every walk and serialized as-is into
//! `<app>_analyze_errors.json`. Nothing in it survives between runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::adapter::FileExtraction;
use crate::model::{ErrorDeclaration, ErrorDetail, Violation};
use crate::walker::parent_dir;

/// Results for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileErrors {
    pub declarations: Vec<ErrorDeclaration>,
    pub details: Vec<ErrorDetail>,
    pub violations: Vec<Violation>,
    /// Read, parse or rewrite failures for this file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl FileErrors {
    pub fn from_extraction(extraction: FileExtraction) -> Self {
        FileErrors {
            declarations: extraction.declarations,
            details: extraction.details,
            violations: extraction.violations,
            errors: Vec::new(),
        }
    }
}

/// One package: a directory plus package clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageErrors {
    /// Package clause; empty when no file in the package could be parsed.
    pub name: String,
    /// Root-relative directory.
    pub dir: String,
    pub files: BTreeMap<String, FileErrors>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentErrors {
    /// Keyed by `"<dir>:<package>"`.
    pub packages: BTreeMap<String, PackageErrors>,
}

/// Aggregate of everything one walk discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoAll {
    pub components: BTreeMap<String, ComponentErrors>,
}

/// Borrowed view of one file entry during iteration.
#[derive(Debug, Clone, Copy)]
pub struct FileView<'a> {
    pub component: &'a str,
    pub package: &'a PackageErrors,
    pub path: &'a str,
    pub file: &'a FileErrors,
}

pub fn package_key(dir: &str, package: &str) -> String {
    format!("{}:{}", dir, package)
}

impl InfoAll {
    pub fn new() -> Self {
        InfoAll::default()
    }

    /// Register a component so it appears in reports even with no files.
    pub fn ensure_component(&mut self, component: &str) {
        self.components.entry(component.to_string()).or_default();
    }

    fn package_mut(&mut self, component: &str, rel_path: &str, package: &str) -> &mut PackageErrors {
        let dir = parent_dir(rel_path);
        self.components
            .entry(component.to_string())
            .or_default()
            .packages
            .entry(package_key(dir, package))
            .or_insert_with(|| PackageErrors {
                name: package.to_string(),
                dir: dir.to_string(),
                files: BTreeMap::new(),
            })
    }

    /// Record a successfully extracted file. Files contributing nothing are dropped.
    pub fn insert_extraction(&mut self, component: &str, rel_path: &str, extraction: FileExtraction) {
        if extraction.is_empty() {
            return;
        }
        let package = extraction.package.clone();
        self.package_mut(component, rel_path, &package)
            .files
            .insert(rel_path.to_string(), FileErrors::from_extraction(extraction));
    }

    /// Attach a per-file failure to the file's entry, creating it if needed.
    pub fn insert_file_error(&mut self, component: &str, rel_path: &str, message: impl Into<String>) {
        let message = message.into();
        // Prefer an existing entry (e.g. a rewrite failure on a parsed file).
        if let Some(file) = self.file_mut(component, rel_path) {
            file.errors.push(message);
            return;
        }
        self.package_mut(component, rel_path, "")
            .files
            .entry(rel_path.to_string())
            .or_default()
            .errors
            .push(message);
    }

    pub fn file_mut(&mut self, component: &str, rel_path: &str) -> Option<&mut FileErrors> {
        self.components
            .get_mut(component)?
            .packages
            .values_mut()
            .find_map(|pkg| pkg.files.get_mut(rel_path))
    }

    /// Every file entry, ordered by component, package key and path.
    pub fn files(&self) -> impl Iterator<Item = FileView<'_>> {
        self.components.iter().flat_map(|(component, comp)| {
            comp.packages.values().flat_map(move |package| {
                package.files.iter().map(move |(path, file)| FileView {
                    component: component.as_str(),
                    package,
                    path: path.as_str(),
                    file,
                })
            })
        })
    }

    /// Declarations of a component ordered by file path then source position.
    pub fn declarations(&self, component: &str) -> Vec<&ErrorDeclaration> {
        let mut decls: Vec<&ErrorDeclaration> = self
            .files()
            .filter(|v| v.component == component)
            .flat_map(|v| v.file.declarations.iter())
            .collect();
        decls.sort_by(|a, b| (&a.file, a.span.start).cmp(&(&b.file, b.span.start)));
        decls
    }

    /// Details of a component ordered by file path then source position.
    pub fn details(&self, component: &str) -> Vec<&ErrorDetail> {
        let mut details: Vec<&ErrorDetail> = self
            .files()
            .filter(|v| v.component == component)
            .flat_map(|v| v.file.details.iter())
            .collect();
        details.sort_by(|a, b| (&a.file, a.span.start).cmp(&(&b.file, b.span.start)));
        details
    }

    /// `(path, message)` for every per-file failure.
    pub fn file_errors(&self) -> Vec<(String, String)> {
        self.files()
            .flat_map(|v| v.file.errors.iter().map(move |e| (v.path.to_string(), e.clone())))
            .collect()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}
