//! Go syntax trees built with tree-sitter.
//!
//! [`parse`] is the only way in: it loads the Go grammar, parses the file and
//! rejects any tree that contains an `ERROR` or missing node, so the matcher
//! only ever sees well-formed files. The helpers below read the handful of
//! node shapes the matcher cares about.

use errorutil_core::types::Span;
use tree_sitter::{Node, Parser, Tree};

use crate::error::ParseError;

/// Longest excerpt of offending source quoted in a syntax error.
const EXCERPT_LEN: usize = 24;

// ============================================================================
// Source files
// ============================================================================

/// One parsed Go file.
pub struct SourceFile<'src> {
    pub src: &'src str,
    pub tree: Tree,
    pub package: String,
    pub imports: Vec<ImportSpec>,
}

impl SourceFile<'_> {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Import path bound to `local` in this file, if any.
    pub fn import_path(&self, local: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| i.local_name() == local)
            .map(|i| i.path.as_str())
    }
}

/// A single `import` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit alias, including `_` and `.`.
    pub alias: Option<String>,
    /// Unquoted import path.
    pub path: String,
}

impl ImportSpec {
    /// Name the package is referred to by in the importing file.
    ///
    /// Without an alias this is the last path segment, which matches the
    /// package clause for every conventional Go module.
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// Parse `src` as a Go file.
///
/// Fails on the first syntax error and on a file without a package clause.
pub fn parse(src: &str) -> Result<SourceFile<'_>, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_go::language())
        .map_err(|e| ParseError::at(src, 0, format!("cannot load Go grammar: {}", e)))?;
    let tree = parser
        .parse(src, None)
        .ok_or_else(|| ParseError::at(src, 0, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let node = first_error(root).unwrap_or(root);
        return Err(syntax_error(src, node));
    }

    let package = package_name(root, src)
        .ok_or_else(|| ParseError::at(src, 0, "expected package clause"))?
        .to_string();
    let imports = imports(root, src);
    Ok(SourceFile {
        src,
        tree,
        package,
        imports,
    })
}

/// First `ERROR` or missing node in source order.
///
/// Descends into an `ERROR` node when one of its children carries the error,
/// so the position points at the offending token rather than its parent.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let inner = node
        .children(&mut cursor)
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error);
    inner.or_else(|| node.is_error().then_some(node))
}

fn syntax_error(src: &str, node: Node<'_>) -> ParseError {
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = node_text(node, src);
        let excerpt: String = text
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(EXCERPT_LEN)
            .collect();
        format!("syntax error near `{}`", excerpt.trim())
    };
    ParseError::at(src, node.start_byte(), message)
}

fn package_name<'src>(root: Node<'_>, src: &'src str) -> Option<&'src str> {
    let clause = named_children(root)
        .into_iter()
        .find(|n| n.kind() == "package_clause")?;
    named_children(clause)
        .into_iter()
        .find(|n| n.kind() == "package_identifier")
        .map(|n| node_text(n, src))
}

fn imports(root: Node<'_>, src: &str) -> Vec<ImportSpec> {
    let mut specs = Vec::new();
    for decl in named_children(root) {
        if decl.kind() != "import_declaration" {
            continue;
        }
        for child in named_children(decl) {
            match child.kind() {
                "import_spec" => specs.extend(import_spec(child, src)),
                "import_spec_list" => specs.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|n| n.kind() == "import_spec")
                        .filter_map(|n| import_spec(n, src)),
                ),
                _ => {}
            }
        }
    }
    specs
}

fn import_spec(node: Node<'_>, src: &str) -> Option<ImportSpec> {
    let path = node.child_by_field_name("path")?;
    Some(ImportSpec {
        alias: node
            .child_by_field_name("name")
            .map(|n| node_text(n, src).to_string()),
        path: unquote(node_text(path, src)),
    })
}

// ============================================================================
// Node helpers
// ============================================================================

/// Source text of `node`.
pub fn node_text<'src>(node: Node<'_>, src: &'src str) -> &'src str {
    src.get(node.byte_range()).unwrap_or_default()
}

pub fn span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

/// Named children without comments.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// All children stored under `field`, in source order.
pub fn field_children<'tree>(node: Node<'tree>, field: &str) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Strip any number of enclosing parentheses.
pub fn unparen(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

pub fn is_string_literal(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "interpreted_string_literal" | "raw_string_literal"
    )
}

/// `pkg.Name` with a plain identifier on the left.
pub fn qualified_name<'src>(node: Node<'_>, src: &'src str) -> Option<(&'src str, &'src str)> {
    let node = unparen(node);
    if node.kind() != "selector_expression" {
        return None;
    }
    let operand = node.child_by_field_name("operand")?;
    let field = node.child_by_field_name("field")?;
    if operand.kind() != "identifier" {
        return None;
    }
    Some((node_text(operand, src), node_text(field, src)))
}

/// Trailing name of an identifier or selector: `Alert` for `errors.Alert`.
pub fn last_segment<'src>(node: Node<'_>, src: &'src str) -> Option<&'src str> {
    let node = unparen(node);
    match node.kind() {
        "identifier" => Some(node_text(node, src)),
        "selector_expression" => node
            .child_by_field_name("field")
            .map(|field| node_text(field, src)),
        _ => None,
    }
}

/// Decode a Go string literal, raw or interpreted.
///
/// Escapes are decoded the way the Go compiler does; an unknown escape is
/// kept as written.
pub fn unquote(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        // Carriage returns are discarded from raw strings.
        return raw.replace('\r', "");
    }
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);

    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some((_, e)) = chars.next() else { break };
        let simple = match e {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            '\'' => Some(b'\''),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(b) = simple {
            out.push(b);
            continue;
        }
        let (len, radix, skip) = match e {
            '0'..='7' => (3, 8, 0),
            'x' => (2, 16, 1),
            'u' => (4, 16, 1),
            'U' => (8, 16, 1),
            _ => {
                let mut buf = [0u8; 4];
                out.push(b'\\');
                out.extend_from_slice(e.encode_utf8(&mut buf).as_bytes());
                continue;
            }
        };
        let digits_start = i + 1 + skip;
        let Some(digits) = inner.get(digits_start..digits_start + len) else {
            break;
        };
        let value = u32::from_str_radix(digits, radix).unwrap_or(0xfffd);
        // The escape letter, or the first octal digit, is already consumed.
        for _ in 0..(len - (1 - skip)) {
            chars.next();
        }
        match e {
            'u' | 'U' => {
                let ch = char::from_u32(value).unwrap_or('\u{fffd}');
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            _ => out.push((value & 0xff) as u8),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parsing {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn package_and_imports() {
            let src = "package kubernetes\n\nimport (\n\t\"fmt\"\n\tmerr \"github.com/layer5io/meshkit/errors\"\n)\n\nimport \"errors\"\n";
            let file = parse(src).unwrap();
            assert_eq!(file.package, "kubernetes");
            assert_eq!(
                file.imports,
                vec![
                    ImportSpec {
                        alias: None,
                        path: "fmt".to_string()
                    },
                    ImportSpec {
                        alias: Some("merr".to_string()),
                        path: "github.com/layer5io/meshkit/errors".to_string()
                    },
                    ImportSpec {
                        alias: None,
                        path: "errors".to_string()
                    },
                ]
            );
            assert_eq!(file.import_path("merr"), Some("github.com/layer5io/meshkit/errors"));
            assert_eq!(file.import_path("errors"), Some("errors"));
            assert_eq!(file.import_path("meshkit"), None);
        }

        #[test]
        fn invalid_body_is_rejected() {
            let src = "package p\n\nconst ErrFooCode = \"replace_me\"\n\nfunc f() { x := := 1 }\n";
            let err = parse(src).err().unwrap();
            assert_eq!(err.line, 5);
            assert!(err.offset >= src.find("func").unwrap());
        }

        #[test]
        fn unclosed_block_is_rejected() {
            let err = parse("package p\n\nfunc f() {\n").err().unwrap();
            assert!(err.line >= 3, "{}", err);
            assert!(!err.message.is_empty());
        }

        #[test]
        fn missing_package_clause_is_rejected() {
            let err = parse("const ErrFooCode = \"1\"\n").err().unwrap();
            assert_eq!(err.message, "expected package clause");
        }

        #[test]
        fn generics_and_comments_parse() {
            let src = "// Package p.\npackage p\n\ntype Set[T comparable] map[T]struct{}\n\nfunc Keys[T comparable](s Set[T]) []T { return nil } // trailing\n";
            assert!(parse(src).is_ok());
        }
    }

    mod helpers {
        use super::*;
        use pretty_assertions::assert_eq;

        fn first_value<'t>(file: &'t SourceFile<'_>) -> Node<'t> {
            let decl = named_children(file.root())
                .into_iter()
                .find(|n| n.kind() == "var_declaration")
                .unwrap();
            let spec = named_children(decl)[0];
            named_children(spec.child_by_field_name("value").unwrap())[0]
        }

        #[test]
        fn unparen_and_selectors() {
            let src = "package p\nvar v = ((errors.Alert))\n";
            let file = parse(src).unwrap();
            let value = first_value(&file);
            assert_eq!(value.kind(), "parenthesized_expression");
            assert_eq!(unparen(value).kind(), "selector_expression");
            assert_eq!(qualified_name(value, src), Some(("errors", "Alert")));
            assert_eq!(last_segment(value, src), Some("Alert"));
        }

        #[test]
        fn literal_span_matches_text() {
            let src = "package p\nvar v = `raw`\n";
            let file = parse(src).unwrap();
            let value = first_value(&file);
            assert!(is_string_literal(value));
            assert_eq!(span(value).slice(src), Some("`raw`"));
            assert_eq!(node_text(value, src), "`raw`");
        }
    }

    mod unquoting {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn interpreted_escapes() {
            assert_eq!(unquote(r#""a\tb\n""#), "a\tb\n");
            assert_eq!(unquote(r#""\"q\"""#), "\"q\"");
            assert_eq!(unquote(r#""\x41\101é\U0001F600""#), "AAé😀");
        }

        #[test]
        fn raw_strings_are_verbatim() {
            assert_eq!(unquote("`a\\n\r\nb`"), "a\\n\nb");
        }

        #[test]
        fn plain_text() {
            assert_eq!(unquote("\"replace_me\""), "replace_me");
            assert_eq!(unquote("\"\""), "");
        }
    }
}
