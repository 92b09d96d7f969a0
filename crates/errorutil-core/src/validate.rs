//! Component-wide convention validation.
//!
//! Validation is a pure function of one [`InfoAll`] snapshot. It never touches
//! the filesystem and never stops at the first problem: every finding is
//! collected so a single run reports everything.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConventionConfig;
use crate::info::InfoAll;
use crate::model::{CodeValue, ErrorDeclaration, Violation, ViolationKind};
use crate::types::Location;

/// A declaration reference used in findings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    pub location: Location,
}

impl NamedLocation {
    fn of(decl: &ErrorDeclaration) -> Self {
        NamedLocation {
            name: decl.name.clone(),
            location: decl.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateName {
    pub name: String,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCode {
    pub code: u64,
    pub declarations: Vec<NamedLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidValue {
    pub name: String,
    pub value: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeyondCounter {
    pub name: String,
    pub code: u64,
    pub next_error_code: u64,
    pub location: Location,
}

/// All findings for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub duplicate_names: Vec<DuplicateName>,
    pub duplicate_codes: Vec<DuplicateCode>,
    pub invalid_values: Vec<InvalidValue>,
    pub beyond_counter: Vec<BeyondCounter>,
    /// Every violation, file-local and component-wide, sorted by location.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}

/// Validate one component of a snapshot.
///
/// `next_error_code` enables the "code beyond counter" check when metadata is
/// available.
pub fn validate(
    info: &InfoAll,
    component: &str,
    conventions: &ConventionConfig,
    next_error_code: Option<u64>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    // (d) style violations surfaced during extraction and binding
    for view in info.files().filter(|v| v.component == component) {
        report.violations.extend(view.file.violations.iter().cloned());
    }

    let decls = info.declarations(component);

    // (a) duplicate names
    let mut by_name: BTreeMap<&str, Vec<&ErrorDeclaration>> = BTreeMap::new();
    for decl in decls.iter().copied() {
        by_name.entry(decl.name.as_str()).or_default().push(decl);
    }
    for (name, group) in by_name.iter().filter(|(_, g)| g.len() > 1) {
        let locations: Vec<Location> = group.iter().map(|d| d.location.clone()).collect();
        for decl in group {
            report.violations.push(
                Violation::new(
                    ViolationKind::DuplicateName,
                    format!("{} is declared {} times in this component", name, group.len()),
                    decl.location.clone(),
                )
                .with_name(*name),
            );
        }
        report.duplicate_names.push(DuplicateName {
            name: name.to_string(),
            locations,
        });
    }

    // (b) numeric code collisions, (c) invalid values, counter check
    let mut by_code: BTreeMap<u64, Vec<&ErrorDeclaration>> = BTreeMap::new();
    for decl in decls.iter().copied() {
        match decl.code_value(&conventions.placeholder) {
            CodeValue::Placeholder => {}
            CodeValue::Numeric(code) => {
                by_code.entry(code).or_default().push(decl);
                if let Some(next) = next_error_code.filter(|next| code >= *next) {
                    report.violations.push(
                        Violation::new(
                            ViolationKind::CodeBeyondCounter,
                            format!(
                                "code {} is not below next_error_code {}",
                                code, next
                            ),
                            decl.location.clone(),
                        )
                        .with_name(&decl.name),
                    );
                    report.beyond_counter.push(BeyondCounter {
                        name: decl.name.clone(),
                        code,
                        next_error_code: next,
                        location: decl.location.clone(),
                    });
                }
            }
            CodeValue::Invalid => {
                report.violations.push(
                    Violation::new(
                        ViolationKind::InvalidCodeValue,
                        format!(
                            "{} has value {:?}; expected {:?} or a non-negative integer",
                            decl.name, decl.value, conventions.placeholder
                        ),
                        decl.location.clone(),
                    )
                    .with_name(&decl.name),
                );
                report.invalid_values.push(InvalidValue {
                    name: decl.name.clone(),
                    value: decl.value.clone(),
                    location: decl.location.clone(),
                });
            }
        }
    }
    for (code, group) in by_code.iter().filter(|(_, g)| g.len() > 1) {
        let names: Vec<&str> = group.iter().map(|d| d.name.as_str()).collect();
        for decl in group {
            report.violations.push(
                Violation::new(
                    ViolationKind::DuplicateCode,
                    format!("code {} is used by {}", code, names.join(", ")),
                    decl.location.clone(),
                )
                .with_name(&decl.name),
            );
        }
        report.duplicate_codes.push(DuplicateCode {
            code: *code,
            declarations: group.iter().map(|d| NamedLocation::of(d)).collect(),
        });
    }

    report
        .violations
        .sort_by(|a, b| (&a.location, a.kind).cmp(&(&b.location, b.kind)));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FileExtraction;
    use crate::model::DeclKind;
    use crate::types::Span;

    fn decl(file: &str, line: u32, name: &str, value: &str) -> ErrorDeclaration {
        ErrorDeclaration {
            name: name.to_string(),
            package: "pkg".to_string(),
            file: file.to_string(),
            value: value.to_string(),
            literal: format!("{:?}", value),
            span: Span::new(line as usize * 10, line as usize * 10 + value.len() + 2),
            kind: DeclKind::Const,
            location: Location::new(file, line, 7),
        }
    }

    fn snapshot(files: &[(&str, Vec<ErrorDeclaration>)]) -> InfoAll {
        let mut info = InfoAll::new();
        for (path, decls) in files {
            let mut ex = FileExtraction::new("pkg");
            ex.declarations = decls.clone();
            info.insert_extraction("c", path, ex);
        }
        info
    }

    #[test]
    fn clean_component() {
        let info = snapshot(&[(
            "a.go",
            vec![
                decl("a.go", 1, "ErrOneCode", "1"),
                decl("a.go", 2, "ErrTwoCode", "replace_me"),
            ],
        )]);
        let report = validate(&info, "c", &ConventionConfig::default(), Some(5));
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn duplicate_codes_are_reported_for_each_declaration() {
        let info = snapshot(&[
            ("a.go", vec![decl("a.go", 1, "ErrOneCode", "12")]),
            ("b.go", vec![decl("b.go", 1, "ErrTwoCode", "12")]),
        ]);
        let report = validate(&info, "c", &ConventionConfig::default(), None);
        assert_eq!(report.duplicate_codes.len(), 1);
        assert_eq!(report.duplicate_codes[0].code, 12);
        assert_eq!(
            report.duplicate_codes[0]
                .declarations
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>(),
            vec!["ErrOneCode", "ErrTwoCode"]
        );
        assert_eq!(report.count(ViolationKind::DuplicateCode), 2);
    }

    #[test]
    fn duplicate_names_across_packages() {
        let info = snapshot(&[
            ("a/x.go", vec![decl("a/x.go", 1, "ErrSameCode", "1")]),
            ("b/x.go", vec![decl("b/x.go", 1, "ErrSameCode", "2")]),
        ]);
        let report = validate(&info, "c", &ConventionConfig::default(), None);
        assert_eq!(report.duplicate_names.len(), 1);
        assert_eq!(report.duplicate_names[0].locations.len(), 2);
        assert_eq!(report.count(ViolationKind::DuplicateName), 2);
    }

    #[test]
    fn invalid_values_collected() {
        let info = snapshot(&[(
            "a.go",
            vec![
                decl("a.go", 1, "ErrOneCode", "meshkit-1"),
                decl("a.go", 2, "ErrTwoCode", ""),
            ],
        )]);
        let report = validate(&info, "c", &ConventionConfig::default(), None);
        assert_eq!(report.invalid_values.len(), 2);
        assert_eq!(report.count(ViolationKind::InvalidCodeValue), 2);
    }

    #[test]
    fn code_at_or_above_counter_is_flagged() {
        let info = snapshot(&[(
            "a.go",
            vec![
                decl("a.go", 1, "ErrOneCode", "4"),
                decl("a.go", 2, "ErrTwoCode", "5"),
            ],
        )]);
        let report = validate(&info, "c", &ConventionConfig::default(), Some(5));
        assert_eq!(report.beyond_counter.len(), 1);
        assert_eq!(report.beyond_counter[0].name, "ErrTwoCode");
        assert!(validate(&info, "c", &ConventionConfig::default(), None)
            .beyond_counter
            .is_empty());
    }

    #[test]
    fn file_violations_are_included_and_sorted() {
        let mut info = snapshot(&[("b.go", vec![decl("b.go", 1, "ErrOneCode", "x")])]);
        let mut ex = FileExtraction::new("pkg");
        ex.violations.push(Violation::new(
            ViolationKind::LiteralCodeArgument,
            "literal",
            Location::new("a.go", 3, 1),
        ));
        info.insert_extraction("c", "a.go", ex);
        let report = validate(&info, "c", &ConventionConfig::default(), None);
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::LiteralCodeArgument, ViolationKind::InvalidCodeValue]
        );
    }
}
