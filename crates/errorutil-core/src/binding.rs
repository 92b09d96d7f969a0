//! Binding detail records to code declarations.
//!
//! A detail call refers to its code by identifier, never by value. Resolution
//! is scoped to one package (directory plus package clause): the calling file
//! is searched first, then every other file of the package. Package-qualified
//! references cannot be resolved across packages and are reported as such.

use std::collections::BTreeMap;

use tracing::debug;

use crate::info::{InfoAll, PackageErrors};
use crate::model::{CodeRef, DeclRef, Violation, ViolationKind};

/// Outcome of resolving one identifier inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Bound(DeclRef),
    Unresolved,
    /// Declared in more than one other file of the package.
    Ambiguous(Vec<String>),
}

/// Name → declaring files, for one package.
#[derive(Debug, Default)]
pub struct PackageIndex {
    by_name: BTreeMap<String, Vec<String>>,
}

impl PackageIndex {
    pub fn build(package: &PackageErrors) -> Self {
        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (path, file) in &package.files {
            for decl in &file.declarations {
                let files = by_name.entry(decl.name.clone()).or_default();
                if !files.contains(path) {
                    files.push(path.clone());
                }
            }
        }
        PackageIndex { by_name }
    }

    pub fn resolve(&self, from_file: &str, name: &str) -> Resolution {
        let Some(files) = self.by_name.get(name) else {
            return Resolution::Unresolved;
        };
        if files.iter().any(|f| f == from_file) {
            return Resolution::Bound(DeclRef {
                file: from_file.to_string(),
                name: name.to_string(),
            });
        }
        match files.as_slice() {
            [only] => Resolution::Bound(DeclRef {
                file: only.clone(),
                name: name.to_string(),
            }),
            many => Resolution::Ambiguous(many.to_vec()),
        }
    }
}

/// Bind every detail in every package, appending violations to the calling file.
///
/// Returns the number of details bound.
pub fn bind_details(info: &mut InfoAll) -> usize {
    let mut bound = 0;
    for component in info.components.values_mut() {
        for package in component.packages.values_mut() {
            bound += bind_package(package);
        }
    }
    bound
}

fn bind_package(package: &mut PackageErrors) -> usize {
    let index = PackageIndex::build(package);
    let mut bound = 0;
    for (path, file) in package.files.iter_mut() {
        let mut violations = Vec::new();
        for detail in file.details.iter_mut() {
            detail.bound_to = None;
            match &detail.code_ref {
                CodeRef::Ident { name } => match index.resolve(path, name) {
                    Resolution::Bound(decl) => {
                        detail.bound_to = Some(decl);
                        bound += 1;
                    }
                    Resolution::Unresolved => violations.push(
                        Violation::new(
                            ViolationKind::UnresolvableCodeReference,
                            format!(
                                "{} is not declared in package {}",
                                name,
                                display_package(package.name.as_str(), package.dir.as_str())
                            ),
                            detail.location.clone(),
                        )
                        .with_name(name.clone()),
                    ),
                    Resolution::Ambiguous(files) => violations.push(
                        Violation::new(
                            ViolationKind::AmbiguousCodeReference,
                            format!("{} is declared in several files: {}", name, files.join(", ")),
                            detail.location.clone(),
                        )
                        .with_name(name.clone()),
                    ),
                },
                CodeRef::Qualified { package: qualifier, name } => violations.push(
                    Violation::new(
                        ViolationKind::UnresolvableCodeReference,
                        format!(
                            "{}.{} refers to another package; codes must be declared in the calling package",
                            qualifier, name
                        ),
                        detail.location.clone(),
                    )
                    .with_name(name.clone()),
                ),
                // Reported by the adapter at extraction time.
                CodeRef::Literal { .. } | CodeRef::Other { .. } | CodeRef::Missing => {}
            }
        }
        if !violations.is_empty() {
            debug!(file = %path, count = violations.len(), "unbound detail calls");
        }
        file.violations.extend(violations);
    }
    bound
}

fn display_package(name: &str, dir: &str) -> String {
    if name.is_empty() {
        dir.to_string()
    } else {
        format!("{} ({})", name, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FileExtraction;
    use crate::model::{DeclKind, ErrorDeclaration, ErrorDetail};
    use crate::types::{Location, Span};

    fn decl(file: &str, name: &str) -> ErrorDeclaration {
        ErrorDeclaration {
            name: name.to_string(),
            package: "pkg".to_string(),
            file: file.to_string(),
            value: "1".to_string(),
            literal: "\"1\"".to_string(),
            span: Span::new(0, 3),
            kind: DeclKind::Const,
            location: Location::new(file, 1, 1),
        }
    }

    fn detail(file: &str, code_ref: CodeRef) -> ErrorDetail {
        ErrorDetail {
            code_ref,
            severity: Some("Alert".to_string()),
            short_description: vec!["Short".to_string()],
            long_description: vec![],
            probable_cause: vec![],
            suggested_remediation: vec![],
            package: "pkg".to_string(),
            file: file.to_string(),
            span: Span::new(10, 20),
            location: Location::new(file, 5, 2),
            bound_to: None,
        }
    }

    fn ident(name: &str) -> CodeRef {
        CodeRef::Ident {
            name: name.to_string(),
        }
    }

    fn add(info: &mut InfoAll, file: &str, decls: Vec<ErrorDeclaration>, details: Vec<ErrorDetail>) {
        let mut ex = FileExtraction::new("pkg");
        ex.declarations = decls;
        ex.details = details;
        info.insert_extraction("c", file, ex);
    }

    fn file<'a>(info: &'a InfoAll, path: &str) -> &'a crate::info::FileErrors {
        info.files().find(|v| v.path == path).unwrap().file
    }

    #[test]
    fn same_file_binding() {
        let mut info = InfoAll::new();
        add(
            &mut info,
            "a/error.go",
            vec![decl("a/error.go", "ErrFooCode")],
            vec![detail("a/error.go", ident("ErrFooCode"))],
        );
        assert_eq!(bind_details(&mut info), 1);
        let f = file(&info, "a/error.go");
        assert_eq!(
            f.details[0].bound_to,
            Some(DeclRef {
                file: "a/error.go".to_string(),
                name: "ErrFooCode".to_string()
            })
        );
        assert!(f.violations.is_empty());
    }

    #[test]
    fn cross_file_within_package_binds() {
        let mut info = InfoAll::new();
        add(&mut info, "a/codes.go", vec![decl("a/codes.go", "ErrFooCode")], vec![]);
        add(
            &mut info,
            "a/details.go",
            vec![],
            vec![detail("a/details.go", ident("ErrFooCode"))],
        );
        assert_eq!(bind_details(&mut info), 1);
        let bound = file(&info, "a/details.go").details[0].bound_to.clone().unwrap();
        assert_eq!(bound.file, "a/codes.go");
    }

    #[test]
    fn other_directory_does_not_bind() {
        let mut info = InfoAll::new();
        add(&mut info, "a/codes.go", vec![decl("a/codes.go", "ErrFooCode")], vec![]);
        add(
            &mut info,
            "b/details.go",
            vec![],
            vec![detail("b/details.go", ident("ErrFooCode"))],
        );
        assert_eq!(bind_details(&mut info), 0);
        let v = &file(&info, "b/details.go").violations;
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::UnresolvableCodeReference);
        assert_eq!(v[0].name.as_deref(), Some("ErrFooCode"));
    }

    #[test]
    fn qualified_reference_is_unresolvable() {
        let mut info = InfoAll::new();
        add(
            &mut info,
            "a/x.go",
            vec![decl("a/x.go", "ErrFooCode")],
            vec![detail(
                "a/x.go",
                CodeRef::Qualified {
                    package: "other".to_string(),
                    name: "ErrFooCode".to_string(),
                },
            )],
        );
        bind_details(&mut info);
        let v = &file(&info, "a/x.go").violations;
        assert_eq!(v[0].kind, ViolationKind::UnresolvableCodeReference);
        assert!(v[0].message.contains("another package"));
    }

    #[test]
    fn duplicate_in_other_files_is_ambiguous() {
        let mut info = InfoAll::new();
        add(&mut info, "a/one.go", vec![decl("a/one.go", "ErrFooCode")], vec![]);
        add(&mut info, "a/two.go", vec![decl("a/two.go", "ErrFooCode")], vec![]);
        add(
            &mut info,
            "a/use.go",
            vec![],
            vec![detail("a/use.go", ident("ErrFooCode"))],
        );
        bind_details(&mut info);
        let v = &file(&info, "a/use.go").violations;
        assert_eq!(v[0].kind, ViolationKind::AmbiguousCodeReference);
    }

    #[test]
    fn same_file_wins_over_other_files() {
        let mut info = InfoAll::new();
        add(&mut info, "a/one.go", vec![decl("a/one.go", "ErrFooCode")], vec![]);
        add(
            &mut info,
            "a/two.go",
            vec![decl("a/two.go", "ErrFooCode")],
            vec![detail("a/two.go", ident("ErrFooCode"))],
        );
        bind_details(&mut info);
        let f = file(&info, "a/two.go");
        assert_eq!(f.details[0].bound_to.as_ref().unwrap().file, "a/two.go");
    }
}
