//! Go implementation of the core [`LanguageAdapter`].
//!
//! The matcher walks a parsed file once and records:
//!
//! - **Declarations**: top-level `const`/`var` specs whose name follows the
//!   code naming convention and whose value is a string literal. The literal's
//!   exact span is kept for rewriting.
//! - **Detail calls**: `errors.New(code, severity, short, long, cause, remedy)`
//!   anywhere in the file, with the four description lists decoded.
//! - **Local violations**: everything about a declaration or call that can be
//!   decided from this file alone.
//!
//! A file that imports the standard library `errors` package under the detail
//! package name never contributes detail calls.

use std::path::Path;

use errorutil_core::adapter::{FileExtraction, LanguageAdapter};
use errorutil_core::config::ConventionConfig;
use errorutil_core::model::{
    CodeRef, DeclKind, ErrorDeclaration, ErrorDetail, Violation, ViolationKind,
};
use errorutil_core::text::LineIndex;
use errorutil_core::types::Location;
use tracing::trace;
use tree_sitter::Node;

use crate::error::ParseError;
use crate::syntax::{
    field_children, is_string_literal, last_segment, named_children, node_text, parse,
    qualified_name, span, unparen, unquote, SourceFile,
};
use crate::visitor::{walk_file, VisitResult, Visitor};

/// Import path of the standard library package that shares the detail
/// package's name.
const STDLIB_ERRORS: &str = "errors";

/// Names of the four description-list arguments, in call order.
const LIST_FIELDS: [&str; 4] = [
    "short description",
    "long description",
    "probable cause",
    "suggested remediation",
];

/// Matches error declarations and detail calls in `*.go` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoAdapter;

impl GoAdapter {
    pub fn new() -> Self {
        GoAdapter
    }
}

impl LanguageAdapter for GoAdapter {
    type Error = ParseError;

    fn language(&self) -> &'static str {
        "go"
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "go")
    }

    fn extract(
        &self,
        path: &str,
        content: &str,
        conventions: &ConventionConfig,
    ) -> Result<FileExtraction, ParseError> {
        let file = parse(content)?;
        let mut matcher = Matcher::new(path, &file, conventions);
        walk_file(&mut matcher, file.root());
        Ok(matcher.extraction)
    }
}

// ============================================================================
// Matcher
// ============================================================================

struct Matcher<'a> {
    path: &'a str,
    src: &'a str,
    lines: LineIndex,
    conventions: &'a ConventionConfig,
    /// The detail package name refers to the standard library here.
    stdlib_errors: bool,
    extraction: FileExtraction,
}

/// Arguments of a call, with a trailing `...` unwrapped.
struct CallArgs<'tree> {
    args: Vec<Node<'tree>>,
    ellipsis: bool,
}

impl<'tree> CallArgs<'tree> {
    fn of(call: Node<'tree>) -> Self {
        let Some(list) = call.child_by_field_name("arguments") else {
            return CallArgs {
                args: Vec::new(),
                ellipsis: false,
            };
        };
        let mut cursor = list.walk();
        let mut ellipsis = list.children(&mut cursor).any(|child| child.kind() == "...");
        let args = named_children(list)
            .into_iter()
            .map(|arg| {
                if arg.kind() == "variadic_argument" {
                    ellipsis = true;
                    named_children(arg).into_iter().next().unwrap_or(arg)
                } else {
                    arg
                }
            })
            .collect();
        CallArgs { args, ellipsis }
    }
}

impl<'a> Matcher<'a> {
    fn new(path: &'a str, file: &'a SourceFile<'_>, conventions: &'a ConventionConfig) -> Self {
        let stdlib_errors = file.import_path(&conventions.detail_package) == Some(STDLIB_ERRORS);
        Matcher {
            path,
            src: file.src,
            lines: LineIndex::new(file.src),
            conventions,
            stdlib_errors,
            extraction: FileExtraction::new(file.package.clone()),
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.src)
    }

    fn location(&self, offset: usize) -> Location {
        self.lines.location(self.path, offset)
    }

    fn violation(&mut self, kind: ViolationKind, offset: usize, message: String, name: Option<&str>) {
        let mut violation = Violation::new(kind, message, self.location(offset));
        if let Some(name) = name {
            violation = violation.with_name(name);
        }
        self.extraction.violations.push(violation);
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    fn match_declaration(
        &mut self,
        kind: DeclKind,
        name: Node<'_>,
        ty: Option<&str>,
        value: Option<Node<'_>>,
    ) {
        let name_text = self.text(name);
        if !self.conventions.is_code_name(name_text) {
            return;
        }
        if ty.is_some_and(|t| t != "string") {
            return;
        }
        let Some(value) = value else {
            return;
        };

        let value = unparen(value);
        if is_string_literal(value) {
            let raw = self.text(value);
            trace!(file = self.path, name = name_text, "declaration");
            self.extraction.declarations.push(ErrorDeclaration {
                name: name_text.to_string(),
                package: self.extraction.package.clone(),
                file: self.path.to_string(),
                value: unquote(raw),
                literal: raw.to_string(),
                span: span(value),
                kind,
                location: self.location(name.start_byte()),
            });
        } else if self.is_non_string(value) {
            // Numeric or boolean constant that merely shares the naming pattern.
        } else if is_concatenation(value) {
            self.violation(
                ViolationKind::StringConcatenation,
                value.start_byte(),
                format!("{} value joins strings with '+'", name_text),
                Some(name_text),
            );
        } else {
            self.violation(
                ViolationKind::NonLiteralDeclarationValue,
                value.start_byte(),
                format!(
                    "{} must be initialised with a string literal, found `{}`",
                    name_text,
                    self.text(value)
                ),
                Some(name_text),
            );
        }
    }

    /// Constant expressions that cannot be strings.
    fn is_non_string(&self, node: Node<'_>) -> bool {
        let node = unparen(node);
        match node.kind() {
            "int_literal" | "float_literal" | "imaginary_literal" | "rune_literal" | "iota"
            | "true" | "false" | "nil" => true,
            "identifier" => matches!(self.text(node), "iota" | "true" | "false" | "nil"),
            "unary_expression" => node
                .child_by_field_name("operand")
                .is_some_and(|operand| self.is_non_string(operand)),
            "binary_expression" => {
                match (node.child_by_field_name("left"), node.child_by_field_name("right")) {
                    (Some(left), Some(right)) => {
                        self.is_non_string(left) && self.is_non_string(right)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Detail calls
    // ------------------------------------------------------------------------

    fn is_detail_call(&self, call: Node<'_>, args: &CallArgs<'_>) -> bool {
        let Some(callee) = call.child_by_field_name("function") else {
            return false;
        };
        let Some((package, function)) = qualified_name(callee, self.src) else {
            return false;
        };
        if !self.conventions.is_detail_callee(package, function) || self.stdlib_errors {
            return false;
        }
        // errors.New("message") is a plain error, not a detail record.
        !(args.args.len() == 1 && !self.is_code_argument(args.args[0]))
    }

    fn is_code_argument(&self, arg: Node<'_>) -> bool {
        let arg = unparen(arg);
        match arg.kind() {
            "identifier" => self.conventions.is_code_name(self.text(arg)),
            "selector_expression" => arg
                .child_by_field_name("field")
                .is_some_and(|field| self.conventions.is_code_name(self.text(field))),
            _ => false,
        }
    }

    fn match_detail(&mut self, call: Node<'_>, args: &CallArgs<'_>) {
        let callee = self.conventions.detail_callee();
        let start = call.start_byte();

        let code_ref = self.code_ref(&callee, args.args.first().copied());
        let name = match &code_ref {
            CodeRef::Ident { name } | CodeRef::Qualified { name, .. } => Some(name.clone()),
            _ => None,
        };
        let name = name.as_deref();

        let arity = self.conventions.detail_arity;
        let count = args.args.len();
        if count != arity {
            self.violation(
                ViolationKind::WrongArgumentCount,
                start,
                format!("{} expects {} arguments, found {}", callee, arity, count),
                name,
            );
        } else if args.ellipsis {
            self.violation(
                ViolationKind::WrongArgumentCount,
                start,
                format!("{} arguments must be written out, not spread with '...'", callee),
                name,
            );
        }

        let severity = match args.args.get(1) {
            Some(&arg) => Some(
                last_segment(arg, self.src)
                    .unwrap_or_else(|| self.text(arg))
                    .to_string(),
            ),
            None => {
                self.violation(
                    ViolationKind::MissingSeverity,
                    start,
                    format!("{} call has no severity argument", callee),
                    name,
                );
                None
            }
        };

        let mut lists: [Vec<String>; 4] = Default::default();
        for (i, field) in LIST_FIELDS.iter().enumerate() {
            if let Some(&arg) = args.args.get(i + 2) {
                lists[i] = self.description_list(field, arg, name);
            }
        }
        let [short_description, long_description, probable_cause, suggested_remediation] = lists;

        trace!(file = self.path, code = %code_ref, "detail call");
        self.extraction.details.push(ErrorDetail {
            code_ref,
            severity,
            short_description,
            long_description,
            probable_cause,
            suggested_remediation,
            package: self.extraction.package.clone(),
            file: self.path.to_string(),
            span: span(call),
            location: self.location(start),
            bound_to: None,
        });
    }

    fn code_ref(&mut self, callee: &str, arg: Option<Node<'_>>) -> CodeRef {
        let Some(arg) = arg else {
            return CodeRef::Missing;
        };
        let arg = unparen(arg);
        if arg.kind() == "identifier" {
            return CodeRef::Ident {
                name: self.text(arg).to_string(),
            };
        }
        if let Some((package, name)) = qualified_name(arg, self.src) {
            return CodeRef::Qualified {
                package: package.to_string(),
                name: name.to_string(),
            };
        }
        let text = self.text(arg);
        if is_string_literal(arg) {
            self.violation(
                ViolationKind::LiteralCodeArgument,
                arg.start_byte(),
                format!(
                    "code argument of {} must be the code constant, found literal {}",
                    callee, text
                ),
                None,
            );
            CodeRef::Literal {
                value: unquote(text),
            }
        } else {
            self.violation(
                ViolationKind::NonIdentifierCodeArgument,
                arg.start_byte(),
                format!(
                    "code argument of {} must be the code constant, found `{}`",
                    callee, text
                ),
                None,
            );
            CodeRef::Other {
                text: text.to_string(),
            }
        }
    }

    /// Decode one `[]string{...}` argument, reporting every bad element.
    fn description_list(&mut self, field: &str, arg: Node<'_>, name: Option<&str>) -> Vec<String> {
        let arg = unparen(arg);
        let body = match arg.kind() {
            "nil" => return Vec::new(),
            "identifier" if self.text(arg) == "nil" => return Vec::new(),
            "composite_literal" => arg.child_by_field_name("body"),
            _ if is_concatenation(arg) => {
                self.violation(
                    ViolationKind::StringConcatenation,
                    arg.start_byte(),
                    format!("{} joins strings with '+'", field),
                    name,
                );
                return Vec::new();
            }
            _ => {
                self.violation(
                    ViolationKind::NonLiteralArgument,
                    arg.start_byte(),
                    format!(
                        "{} must be a []string literal or nil, found `{}`",
                        field,
                        self.text(arg)
                    ),
                    name,
                );
                return Vec::new();
            }
        };
        let Some(body) = body else {
            return Vec::new();
        };

        let mut statements = Vec::new();
        for element in named_children(body) {
            let element = unparen(unwrap_element(element));
            let text = self.text(element);
            if is_string_literal(element) {
                let statement = unquote(text);
                if !self.conventions.is_capitalized(&statement) {
                    self.violation(
                        ViolationKind::NotCapitalized,
                        element.start_byte(),
                        format!("{} statement {} must start with an upper-case letter", field, text),
                        name,
                    );
                }
                statements.push(statement);
                continue;
            }
            match element.kind() {
                // Dynamic text such as err.Error() is allowed and left out.
                "call_expression" => {}
                _ if is_concatenation(element) => self.violation(
                    ViolationKind::StringConcatenation,
                    element.start_byte(),
                    format!("{} element joins strings with '+'", field),
                    name,
                ),
                _ => self.violation(
                    ViolationKind::NonLiteralElement,
                    element.start_byte(),
                    format!("{} element `{}` is not a string literal", field, text),
                    name,
                ),
            }
        }
        statements
    }
}

impl<'tree> Visitor<'tree> for Matcher<'_> {
    fn visit_value_spec(&mut self, kind: DeclKind, spec: Node<'tree>) -> VisitResult {
        let ty = spec.child_by_field_name("type").map(|t| self.text(t));
        let values = spec
            .child_by_field_name("value")
            .map(named_children)
            .unwrap_or_default();
        for (index, name) in field_children(spec, "name").into_iter().enumerate() {
            self.match_declaration(kind, name, ty, values.get(index).copied());
        }
        // Values may still hold detail calls (package-level closures).
        VisitResult::Continue
    }

    fn visit_call(&mut self, call: Node<'tree>) -> VisitResult {
        let args = CallArgs::of(call);
        if self.is_detail_call(call, &args) {
            self.match_detail(call, &args);
        }
        VisitResult::Continue
    }
}

/// Composite literal elements may be wrapped in an `element` node.
fn unwrap_element(node: Node<'_>) -> Node<'_> {
    match node.kind() {
        "element" | "literal_element" => named_children(node).into_iter().next().unwrap_or(node),
        _ => node,
    }
}

/// `a + b` where either side holds a string literal.
fn is_concatenation(node: Node<'_>) -> bool {
    let node = unparen(node);
    node.kind() == "binary_expression"
        && node
            .child_by_field_name("operator")
            .is_some_and(|op| op.kind() == "+")
        && (node.child_by_field_name("left").is_some_and(contains_string_lit)
            || node.child_by_field_name("right").is_some_and(contains_string_lit))
}

fn contains_string_lit(node: Node<'_>) -> bool {
    let node = unparen(node);
    if is_string_literal(node) {
        return true;
    }
    node.kind() == "binary_expression"
        && (node.child_by_field_name("left").is_some_and(contains_string_lit)
            || node.child_by_field_name("right").is_some_and(contains_string_lit))
}
