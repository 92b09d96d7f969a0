//! Text printed by `errorutil doc`.

use errorutil_core::component::COMPONENT_INFO_FILE;
use errorutil_core::config::ConventionConfig;
use errorutil_core::export::{errors_file_name, export_file_name, summary_file_name};

/// Render the convention documentation for the given conventions.
pub fn convention_doc(conventions: &ConventionConfig) -> String {
    let callee = conventions.detail_callee();
    format!(
        r#"errorutil analyzes, validates and updates MeshKit compatible errors in Go source trees.

A compatible error has two parts.

An error code: a constant (preferred) or variable of type string.
  - Its name matches the pattern "{pattern}", e.g. ErrApplyManifestCode.
  - A developer sets the initial value to the placeholder "{placeholder}".
  - The 'update' command replaces the placeholder with the next free integer,
    usually as part of a CI workflow.

An error detail, built with {callee}(code, severity, short, long, cause, remedy):
  - 'code' is the error code constant itself, never a string literal.
  - 'severity' is one of the severity values of the errors package.
  - The remaining {lists} arguments are string slices: short and long description,
    probable cause and suggested remediation.
  - Put static text in string literals, not in constants or variables.
  - Start every statement with an upper-case letter.
  - Calls such as err.Error() are allowed; they are left out of the export.
  - Do not join strings with '+'; add another element to the slice instead.

Further conventions:
  - Each package keeps its errors in a file named error.go.
  - Codes are unique within a component and never shared across components.
  - Components choose their own code ranges. Codes carry no meaning.

Components:
  - A component has a name and a type, e.g. name 'meshkit' and type 'library'.
    A component usually corresponds to one repository.
  - The tool reads {info_file} from the info directory:
      {{
        "name": "meshkit",
        "type": "library",
        "next_error_code": 1014
      }}
  - next_error_code is the next integer handed out. 'update' advances it.

Produced files:
  - {errors_file}: every declaration, detail and violation found
  - {summary_file}: counts, duplicates and violations, for validation
  - {export_file}: the component's errors keyed by code, for the error reference

Exit codes: 0 clean, 1 violations, 2 invalid arguments, 3 unreadable or
unparseable files, 4 component metadata problem, 5 counter out of sync with
rewritten sources, 10 internal error.
"#,
        pattern = conventions.code_name.as_str(),
        placeholder = conventions.placeholder,
        callee = callee,
        lists = conventions.detail_arity.saturating_sub(2),
        info_file = COMPONENT_INFO_FILE,
        errors_file = errors_file_name(),
        summary_file = summary_file_name(),
        export_file = export_file_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_reflects_conventions() {
        let doc = convention_doc(&ConventionConfig::default());
        assert!(doc.contains("^Err[A-Z].+Code$"));
        assert!(doc.contains("\"replace_me\""));
        assert!(doc.contains("errors.New(code, severity"));
        assert!(doc.contains("component_info.json"));
        assert!(doc.contains("errorutil_errors_export.json"));
        assert!(doc.contains("\"next_error_code\": 1014"));
    }
}
