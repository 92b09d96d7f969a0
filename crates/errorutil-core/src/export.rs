//! Documentation export and artifact writing.
//!
//! Three artifacts are written per run, all as indented JSON:
//!
//! | File | Contents |
//! |------|----------|
//! | `<app>_analyze_errors.json` | raw [`InfoAll`] snapshot |
//! | `<app>_analyze_summary.json` | [`AnalysisSummary`](crate::summary::AnalysisSummary) |
//! | `<app>_errors_export.json` | [`ComponentExport`] |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::component::ComponentInfo;
use crate::config::{ConventionConfig, APP};
use crate::info::InfoAll;
use crate::model::{ErrorDeclaration, ErrorDetail};
use crate::rewrite::atomic_write;

pub fn errors_file_name() -> String {
    format!("{}_analyze_errors.json", APP)
}

pub fn summary_file_name() -> String {
    format!("{}_analyze_summary.json", APP)
}

pub fn export_file_name() -> String {
    format!("{}_errors_export.json", APP)
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    pub fn path(&self) -> &Path {
        match self {
            ExportError::Serialize { path, .. } | ExportError::Write { path, .. } => path,
        }
    }
}

/// Public record of one error code. No file or position data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub code: String,
    pub severity: String,
    pub short_description: String,
    pub long_description: String,
    pub probable_cause: String,
    pub suggested_remediation: String,
}

/// Export document for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentExport {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub next_error_code: u64,
    /// Keyed by code. Numeric string keys sort lexically in JSON, so they are
    /// emitted in numeric order through [`CodeKey`].
    pub errors: BTreeMap<CodeKey, ExportRecord>,
}

/// Map key that orders numerically but serializes as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeKey(pub u64);

impl Serialize for CodeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CodeKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map(CodeKey).map_err(serde::de::Error::custom)
    }
}

/// Build the export for one component.
///
/// Only declarations with a numeric code and a bound detail are exported.
/// When two declarations share a code the first in path/position order wins.
pub fn build_export(
    info: &InfoAll,
    component: &str,
    metadata: &ComponentInfo,
    conventions: &ConventionConfig,
) -> ComponentExport {
    let details = info.details(component);
    let mut errors = BTreeMap::new();

    for decl in info.declarations(component) {
        let Some(code) = decl.numeric_code(&conventions.placeholder) else {
            continue;
        };
        if errors.contains_key(&CodeKey(code)) {
            debug!(code, name = %decl.name, "duplicate code not exported");
            continue;
        }
        let Some(detail) = find_detail(decl, &details) else {
            continue;
        };
        errors.insert(CodeKey(code), record(decl, code, detail));
    }

    ComponentExport {
        name: metadata.name.clone(),
        component_type: metadata.component_type.clone(),
        next_error_code: metadata.next_error_code,
        errors,
    }
}

fn find_detail<'a>(decl: &ErrorDeclaration, details: &[&'a ErrorDetail]) -> Option<&'a ErrorDetail> {
    details.iter().copied().find(|d| {
        d.bound_to
            .as_ref()
            .is_some_and(|b| b.file == decl.file && b.name == decl.name)
    })
}

fn record(decl: &ErrorDeclaration, code: u64, detail: &ErrorDetail) -> ExportRecord {
    ExportRecord {
        name: decl.name.clone(),
        code: code.to_string(),
        severity: detail.severity.clone().unwrap_or_default(),
        short_description: detail.short_description.join(" "),
        long_description: detail.long_description.join(" "),
        probable_cause: detail.probable_cause.join(" "),
        suggested_remediation: detail.suggested_remediation.join(" "),
    }
}

/// Serialize `value` as indented JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|source| ExportError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');
    atomic_write(path, text.as_bytes()).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "wrote artifact");
    Ok(())
}
