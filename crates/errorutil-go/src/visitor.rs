//! Visitor trait and walk functions over a tree-sitter Go tree.
//!
//! - **Pre-order**: `visit_*` is called before descending into children
//! - **Post-order**: `leave_*` is called after all children have been visited
//! - **Source order**: children are visited left-to-right
//!
//! `VisitResult::SkipChildren` skips a node's children but still calls
//! `leave_*`; `VisitResult::Stop` halts the walk without further callbacks.
//!
//! Value specs are reported only for top-level `const` and `var`
//! declarations. Calls are reported wherever they appear.

use errorutil_core::model::DeclKind;
use tree_sitter::Node;

use crate::syntax::named_children;

/// Controls how the walker proceeds after a `visit_*` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    #[default]
    Continue,
    SkipChildren,
    Stop,
}

/// Read-only traversal of a parsed file.
///
/// Every method has a no-op default, so implementors only override the nodes
/// they care about.
pub trait Visitor<'tree> {
    /// A top-level `const_spec` or `var_spec`.
    fn visit_value_spec(&mut self, _kind: DeclKind, _spec: Node<'tree>) -> VisitResult {
        VisitResult::Continue
    }

    fn leave_value_spec(&mut self, _kind: DeclKind, _spec: Node<'tree>) {}

    /// A `call_expression`.
    fn visit_call(&mut self, _call: Node<'tree>) -> VisitResult {
        VisitResult::Continue
    }

    fn leave_call(&mut self, _call: Node<'tree>) {}
}

// ============================================================================
// Walk functions
// ============================================================================

macro_rules! walk_all {
    ($visitor:expr, $walk:ident, $nodes:expr) => {
        for node in $nodes {
            if $walk($visitor, node) == VisitResult::Stop {
                return VisitResult::Stop;
            }
        }
    };
}

/// Walk a `source_file` node.
pub fn walk_file<'tree, V: Visitor<'tree>>(visitor: &mut V, root: Node<'tree>) -> VisitResult {
    for decl in named_children(root) {
        let result = match decl.kind() {
            "const_declaration" => walk_gen_decl(visitor, DeclKind::Const, decl),
            "var_declaration" => walk_gen_decl(visitor, DeclKind::Var, decl),
            _ => walk_node(visitor, decl),
        };
        if result == VisitResult::Stop {
            return VisitResult::Stop;
        }
    }
    VisitResult::Continue
}

fn walk_gen_decl<'tree, V: Visitor<'tree>>(
    visitor: &mut V,
    kind: DeclKind,
    decl: Node<'tree>,
) -> VisitResult {
    for spec in value_specs(decl) {
        if walk_value_spec(visitor, kind, spec) == VisitResult::Stop {
            return VisitResult::Stop;
        }
    }
    VisitResult::Continue
}

/// Specs of a `const`/`var` declaration, flattening a parenthesized list.
fn value_specs(decl: Node<'_>) -> Vec<Node<'_>> {
    let mut specs = Vec::new();
    for child in named_children(decl) {
        match child.kind() {
            "const_spec" | "var_spec" => specs.push(child),
            "var_spec_list" => specs.extend(
                named_children(child)
                    .into_iter()
                    .filter(|n| n.kind() == "var_spec"),
            ),
            _ => {}
        }
    }
    specs
}

pub fn walk_value_spec<'tree, V: Visitor<'tree>>(
    visitor: &mut V,
    kind: DeclKind,
    spec: Node<'tree>,
) -> VisitResult {
    match visitor.visit_value_spec(kind, spec) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            if let Some(values) = spec.child_by_field_name("value") {
                walk_all!(visitor, walk_node, [values]);
            }
        }
    }
    visitor.leave_value_spec(kind, spec);
    VisitResult::Continue
}

/// Walk any node, reporting the calls inside it.
pub fn walk_node<'tree, V: Visitor<'tree>>(visitor: &mut V, node: Node<'tree>) -> VisitResult {
    if node.kind() == "call_expression" {
        return walk_call(visitor, node);
    }
    walk_all!(visitor, walk_node, named_children(node));
    VisitResult::Continue
}

pub fn walk_call<'tree, V: Visitor<'tree>>(visitor: &mut V, call: Node<'tree>) -> VisitResult {
    match visitor.visit_call(call) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => walk_all!(visitor, walk_node, named_children(call)),
    }
    visitor.leave_call(call);
    VisitResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{node_text, parse};

    const SRC: &str = r#"package foo

var ErrFooCode = "replace_me"

const (
	ErrBarCode = "1"
	limit      = 3
)

func f() {
	const ErrLocalCode = "2"
	a(b(c()), func() { d() })
}

func g() {
	e()
}
"#;

    #[derive(Default)]
    struct CallNames {
        names: Vec<String>,
        stop_at: Option<&'static str>,
        skip_args_of: Option<&'static str>,
        left: usize,
    }

    impl<'tree> Visitor<'tree> for CallNames {
        fn visit_call(&mut self, call: Node<'tree>) -> VisitResult {
            let callee = call.child_by_field_name("function").unwrap();
            let name = node_text(callee, SRC).to_string();
            self.names.push(name.clone());
            if Some(name.as_str()) == self.stop_at {
                VisitResult::Stop
            } else if Some(name.as_str()) == self.skip_args_of {
                VisitResult::SkipChildren
            } else {
                VisitResult::Continue
            }
        }

        fn leave_call(&mut self, _call: Node<'tree>) {
            self.left += 1;
        }
    }

    #[test]
    fn calls_in_source_order() {
        let file = parse(SRC).unwrap();
        let mut v = CallNames::default();
        assert_eq!(walk_file(&mut v, file.root()), VisitResult::Continue);
        assert_eq!(v.names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(v.left, 5);
    }

    #[test]
    fn skip_children_still_leaves() {
        let file = parse(SRC).unwrap();
        let mut v = CallNames {
            skip_args_of: Some("a"),
            ..Default::default()
        };
        walk_file(&mut v, file.root());
        assert_eq!(v.names, vec!["a", "e"]);
        assert_eq!(v.left, 2);
    }

    #[test]
    fn stop_halts_everything() {
        let file = parse(SRC).unwrap();
        let mut v = CallNames {
            stop_at: Some("c"),
            ..Default::default()
        };
        assert_eq!(walk_file(&mut v, file.root()), VisitResult::Stop);
        assert_eq!(v.names, vec!["a", "b", "c"]);
        assert_eq!(v.left, 0);
    }

    #[test]
    fn only_top_level_value_specs_are_visited() {
        struct Specs(Vec<(DeclKind, String)>);
        impl<'tree> Visitor<'tree> for Specs {
            fn visit_value_spec(&mut self, kind: DeclKind, spec: Node<'tree>) -> VisitResult {
                let name = spec.child_by_field_name("name").unwrap();
                self.0.push((kind, node_text(name, SRC).to_string()));
                VisitResult::SkipChildren
            }
        }
        let file = parse(SRC).unwrap();
        let mut v = Specs(Vec::new());
        walk_file(&mut v, file.root());
        assert_eq!(
            v.0,
            vec![
                (DeclKind::Var, "ErrFooCode".to_string()),
                (DeclKind::Const, "ErrBarCode".to_string()),
                (DeclKind::Const, "limit".to_string()),
            ]
        );
    }
}
