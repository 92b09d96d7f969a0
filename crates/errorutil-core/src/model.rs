//! Error declaration data model.
//!
//! Everything here is rebuilt from source text on every walk. The only durable
//! state across runs is the component counter and the source files themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Location, Span};

// ============================================================================
// Declarations
// ============================================================================

/// How an error code identifier is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// `const` declaration (preferred).
    Const,
    /// `var` declaration.
    Var,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Const => write!(f, "const"),
            DeclKind::Var => write!(f, "var"),
        }
    }
}

/// Classification of a declaration's literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeValue {
    /// The canonical placeholder, awaiting assignment.
    Placeholder,
    /// A permanent numeric code.
    Numeric(u64),
    /// Neither placeholder nor a non-negative decimal integer.
    Invalid,
}

impl CodeValue {
    /// Classify a literal's unquoted value.
    pub fn classify(value: &str, placeholder: &str) -> Self {
        if value == placeholder {
            return CodeValue::Placeholder;
        }
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(code) = value.parse::<u64>() {
                return CodeValue::Numeric(code);
            }
        }
        CodeValue::Invalid
    }
}

/// A string constant or variable following the error code naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDeclaration {
    /// Identifier, e.g. `ErrApplyManifestCode`.
    pub name: String,
    /// Package clause of the declaring file.
    pub package: String,
    /// Declaring file, root-relative with forward slashes.
    pub file: String,
    /// Unquoted literal value.
    pub value: String,
    /// Literal exactly as written, quotes included.
    pub literal: String,
    /// Byte span of `literal` in the file.
    pub span: Span,
    pub kind: DeclKind,
    pub location: Location,
}

impl ErrorDeclaration {
    pub fn code_value(&self, placeholder: &str) -> CodeValue {
        CodeValue::classify(&self.value, placeholder)
    }

    pub fn numeric_code(&self, placeholder: &str) -> Option<u64> {
        match self.code_value(placeholder) {
            CodeValue::Numeric(code) => Some(code),
            _ => None,
        }
    }
}

// ============================================================================
// Details
// ============================================================================

/// The first argument of a detail-construction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeRef {
    /// A bare identifier; the only accepted form.
    Ident { name: String },
    /// A package-qualified identifier (`other.ErrFooCode`).
    Qualified { package: String, name: String },
    /// A string literal written in place of the identifier.
    Literal { value: String },
    /// Any other expression, as source text.
    Other { text: String },
    /// The call has no arguments.
    Missing,
}

impl fmt::Display for CodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeRef::Ident { name } => write!(f, "{}", name),
            CodeRef::Qualified { package, name } => write!(f, "{}.{}", package, name),
            CodeRef::Literal { value } => write!(f, "{:?}", value),
            CodeRef::Other { text } => write!(f, "{}", text),
            CodeRef::Missing => write!(f, "<missing>"),
        }
    }
}

/// The declaration a detail record was bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclRef {
    pub file: String,
    pub name: String,
}

/// A detail-construction call: severity, descriptions, cause and remedy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code_ref: CodeRef,
    /// Severity token, e.g. `Alert` for `errors.Alert`.
    pub severity: Option<String>,
    pub short_description: Vec<String>,
    pub long_description: Vec<String>,
    pub probable_cause: Vec<String>,
    pub suggested_remediation: Vec<String>,
    pub package: String,
    pub file: String,
    /// Byte span of the whole call expression.
    pub span: Span,
    pub location: Location,
    /// Filled in by package binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<DeclRef>,
}

// ============================================================================
// Violations
// ============================================================================

/// Every convention rule the validator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Value is neither the placeholder nor a non-negative integer.
    InvalidCodeValue,
    /// Code declaration initialized with something other than a literal.
    NonLiteralDeclarationValue,
    /// Detail call passes a string literal as its code.
    LiteralCodeArgument,
    /// Detail call passes an expression that is not an identifier as its code.
    NonIdentifierCodeArgument,
    /// Detail call code identifier has no declaration in its package.
    UnresolvableCodeReference,
    /// Detail call code identifier is declared more than once in its package.
    AmbiguousCodeReference,
    /// Detail call has no severity argument.
    MissingSeverity,
    /// Detail call argument count differs from the convention.
    WrongArgumentCount,
    /// Description argument is not a literal string list.
    NonLiteralArgument,
    /// Description list element is an identifier or other non-literal.
    NonLiteralElement,
    /// Description built with the `+` operator.
    StringConcatenation,
    /// Description statement does not start with an upper-case letter.
    NotCapitalized,
    /// Same declaration name used twice within a component.
    DuplicateName,
    /// Same numeric code used twice within a component.
    DuplicateCode,
    /// Numeric code at or above the component's next free code.
    CodeBeyondCounter,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::InvalidCodeValue => "invalid_code_value",
            ViolationKind::NonLiteralDeclarationValue => "non_literal_declaration_value",
            ViolationKind::LiteralCodeArgument => "literal_code_argument",
            ViolationKind::NonIdentifierCodeArgument => "non_identifier_code_argument",
            ViolationKind::UnresolvableCodeReference => "unresolvable_code_reference",
            ViolationKind::AmbiguousCodeReference => "ambiguous_code_reference",
            ViolationKind::MissingSeverity => "missing_severity",
            ViolationKind::WrongArgumentCount => "wrong_argument_count",
            ViolationKind::NonLiteralArgument => "non_literal_argument",
            ViolationKind::NonLiteralElement => "non_literal_element",
            ViolationKind::StringConcatenation => "string_concatenation",
            ViolationKind::NotCapitalized => "not_capitalized",
            ViolationKind::DuplicateName => "duplicate_name",
            ViolationKind::DuplicateCode => "duplicate_code",
            ViolationKind::CodeBeyondCounter => "code_beyond_counter",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A convention violation. Violations are data, not process errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
    pub location: Location,
    /// Declaration or code reference the violation concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>, location: Location) -> Self {
        Violation {
            kind,
            message: message.into(),
            location,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.location, self.kind, self.message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod code_value {
        use super::*;

        #[test]
        fn placeholder_is_recognized() {
            assert_eq!(
                CodeValue::classify("replace_me", "replace_me"),
                CodeValue::Placeholder
            );
        }

        #[test]
        fn decimal_integers_are_numeric() {
            assert_eq!(CodeValue::classify("0", "replace_me"), CodeValue::Numeric(0));
            assert_eq!(
                CodeValue::classify("11014", "replace_me"),
                CodeValue::Numeric(11014)
            );
        }

        #[test]
        fn everything_else_is_invalid() {
            for value in ["", "-1", "12a", "meshkit-11", " 12", "1_000", "0x10"] {
                assert_eq!(
                    CodeValue::classify(value, "replace_me"),
                    CodeValue::Invalid,
                    "value {:?}",
                    value
                );
            }
        }

        #[test]
        fn overflowing_integer_is_invalid() {
            assert_eq!(
                CodeValue::classify("99999999999999999999999", "replace_me"),
                CodeValue::Invalid
            );
        }
    }

    mod serialization {
        use super::*;

        #[test]
        fn code_ref_is_tagged() {
            let json = serde_json::to_value(CodeRef::Ident {
                name: "ErrFooCode".to_string(),
            })
            .unwrap();
            assert_eq!(json["kind"], "ident");
            assert_eq!(json["name"], "ErrFooCode");
        }

        #[test]
        fn violation_kind_uses_snake_case() {
            let json = serde_json::to_value(ViolationKind::UnresolvableCodeReference).unwrap();
            assert_eq!(json, "unresolvable_code_reference");
            assert_eq!(
                ViolationKind::UnresolvableCodeReference.to_string(),
                "unresolvable_code_reference"
            );
        }

        #[test]
        fn violation_display_includes_location_and_kind() {
            let v = Violation::new(
                ViolationKind::DuplicateCode,
                "code 12 used by ErrACode and ErrBCode",
                Location::new("a/error.go", 4, 2),
            );
            assert_eq!(
                v.to_string(),
                "a/error.go:4:2: [duplicate_code] code 12 used by ErrACode and ErrBCode"
            );
        }
    }
}
