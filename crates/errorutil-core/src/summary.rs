//! The analysis summary: a read-only view over one snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConventionConfig;
use crate::info::InfoAll;
use crate::model::{CodeValue, ErrorDeclaration, Violation};
use crate::validate::{
    validate, BeyondCounter, DuplicateCode, DuplicateName, InvalidValue, NamedLocation,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub files: usize,
    pub declarations: usize,
    pub details: usize,
    pub placeholders: usize,
    pub numeric_codes: usize,
    pub invalid_values: usize,
    pub orphans: usize,
    pub violations: usize,
    pub file_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Summary of one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub totals: Totals,
    pub min_code: Option<u64>,
    pub max_code: Option<u64>,
    /// Persisted counter, when component metadata was available.
    pub next_error_code: Option<u64>,
    pub duplicate_names: Vec<DuplicateName>,
    pub duplicate_codes: Vec<DuplicateCode>,
    pub invalid_values: Vec<InvalidValue>,
    pub beyond_counter: Vec<BeyondCounter>,
    /// Declarations no detail call refers to. Informational only.
    pub orphans: Vec<NamedLocation>,
    pub violations: Vec<Violation>,
    pub file_errors: Vec<FileError>,
}

/// Summary of a whole walk, keyed by component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub components: BTreeMap<String, ComponentSummary>,
}

impl AnalysisSummary {
    /// Derive the summary from one snapshot.
    ///
    /// `counters` supplies the persisted `next_error_code` per component.
    pub fn compute(
        info: &InfoAll,
        conventions: &ConventionConfig,
        counters: &BTreeMap<String, u64>,
    ) -> Self {
        let components = info
            .component_names()
            .map(|name| {
                let next = counters.get(name).copied();
                (
                    name.to_string(),
                    summarize_component(info, name, conventions, next),
                )
            })
            .collect();
        AnalysisSummary { components }
    }

    pub fn violation_count(&self) -> usize {
        self.components.values().map(|c| c.violations.len()).sum()
    }

    pub fn file_error_count(&self) -> usize {
        self.components.values().map(|c| c.file_errors.len()).sum()
    }
}

fn summarize_component(
    info: &InfoAll,
    component: &str,
    conventions: &ConventionConfig,
    next_error_code: Option<u64>,
) -> ComponentSummary {
    let report = validate(info, component, conventions, next_error_code);
    let decls = info.declarations(component);
    let details = info.details(component);

    let mut totals = Totals::default();
    let mut codes = Vec::new();
    for decl in &decls {
        match decl.code_value(&conventions.placeholder) {
            CodeValue::Placeholder => totals.placeholders += 1,
            CodeValue::Numeric(code) => {
                totals.numeric_codes += 1;
                codes.push(code);
            }
            CodeValue::Invalid => totals.invalid_values += 1,
        }
    }

    let orphans: Vec<NamedLocation> = decls
        .iter()
        .filter(|decl| !is_referenced(decl, &details))
        .map(|decl| NamedLocation {
            name: decl.name.clone(),
            location: decl.location.clone(),
        })
        .collect();

    let file_errors: Vec<FileError> = info
        .files()
        .filter(|v| v.component == component)
        .flat_map(|v| {
            v.file.errors.iter().map(move |message| FileError {
                file: v.path.to_string(),
                message: message.clone(),
            })
        })
        .collect();

    totals.files = info.files().filter(|v| v.component == component).count();
    totals.declarations = decls.len();
    totals.details = details.len();
    totals.orphans = orphans.len();
    totals.violations = report.violations.len();
    totals.file_errors = file_errors.len();

    ComponentSummary {
        totals,
        min_code: codes.iter().copied().min(),
        max_code: codes.iter().copied().max(),
        next_error_code,
        duplicate_names: report.duplicate_names,
        duplicate_codes: report.duplicate_codes,
        invalid_values: report.invalid_values,
        beyond_counter: report.beyond_counter,
        orphans,
        violations: report.violations,
        file_errors,
    }
}

fn is_referenced(decl: &ErrorDeclaration, details: &[&crate::model::ErrorDetail]) -> bool {
    details.iter().any(|d| {
        d.bound_to
            .as_ref()
            .is_some_and(|b| b.file == decl.file && b.name == decl.name)
    })
}
