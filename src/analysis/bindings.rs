//! Call and local-binding collection for one function.
//!
//! A name bound anywhere inside the function can hold an arbitrary runtime
//! value, so calls through it are never resolved to module-level functions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::defs::DefNode;
use super::python;
use super::ParsedModule;
use crate::error::Result;

/// A call through an attribute chain rooted at a plain name,
/// e.g. `pkg.sub.helper()` is `root = "pkg"`, `chain = ["sub", "helper"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedCall {
    pub root: String,
    pub chain: Vec<String>,
}

/// Calls made and names bound inside a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSet {
    /// Callees that are plain identifiers.
    pub bare_calls: BTreeSet<String>,
    /// Callees that are attribute chains rooted at an identifier.
    pub qualified_calls: Vec<QualifiedCall>,
    /// Parameters and every other name bound in the function.
    pub bound_locals: BTreeSet<String>,
}

impl BindingSet {
    pub fn is_bound(&self, name: &str) -> bool {
        self.bound_locals.contains(name)
    }
}

/// Collect the binding set for a gathered definition.
///
/// The walk covers the whole definition including decorators, nested
/// functions, lambdas and comprehensions.
pub fn collect(parsed: &ParsedModule, target: &DefNode) -> Result<BindingSet> {
    let mut set = BindingSet::default();
    set.bound_locals
        .extend(target.def.param_names().map(str::to_string));

    let analyzer = python::analyzer()?;
    for callee in analyzer.callees(target.outer, parsed.source.as_bytes()) {
        match callee.kind() {
            "identifier" => {
                set.bare_calls.insert(parsed.node_text(callee).to_string());
            }
            "attribute" => {
                if let Some(call) = attribute_chain(parsed, callee) {
                    set.qualified_calls.push(call);
                }
            }
            _ => {}
        }
    }

    if let Some(body) = target.node.child_by_field_name("body") {
        collect_bound(parsed, body, &mut set.bound_locals);
    }

    Ok(set)
}

/// Split `a.b.c` into `("a", ["b", "c"])`.
///
/// Chains rooted at anything other than a plain name (call results,
/// subscripts, literals) return `None`.
pub fn attribute_chain(parsed: &ParsedModule, node: Node) -> Option<QualifiedCall> {
    let mut chain = Vec::new();
    let mut cur = node;
    while cur.kind() == "attribute" {
        chain.push(parsed.node_text(cur.child_by_field_name("attribute")?).to_string());
        cur = cur.child_by_field_name("object")?;
    }
    if cur.kind() != "identifier" || chain.is_empty() {
        return None;
    }
    chain.reverse();
    Some(QualifiedCall {
        root: parsed.node_text(cur).to_string(),
        chain,
    })
}

/// Walk a subtree and record every name it binds.
fn collect_bound(parsed: &ParsedModule, node: Node, bound: &mut BTreeSet<String>) {
    match node.kind() {
        "assignment" | "augmented_assignment" => {
            if let Some(left) = node.child_by_field_name("left") {
                add_targets(parsed, left, bound);
            }
        }
        "for_statement" | "for_in_clause" => {
            if let Some(left) = node.child_by_field_name("left") {
                add_targets(parsed, left, bound);
            }
        }
        "named_expression" => {
            if let Some(name) = node.child_by_field_name("name") {
                add_targets(parsed, name, bound);
            }
        }
        "with_item" => {
            if let Some(value) = node.child_by_field_name("value") {
                add_as_pattern_alias(parsed, value, bound);
            }
        }
        "except_clause" | "except_group_clause" => add_except_name(parsed, node, bound),
        "function_definition" | "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                bound.insert(parsed.node_text(name).to_string());
            }
        }
        "import_statement" | "import_from_statement" => add_import_names(parsed, node, bound),
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_bound(parsed, child, bound);
    }
}

/// Record identifiers in an assignment-style target, unpacking nested
/// tuples, lists and starred targets. Attribute and subscript targets bind
/// nothing local.
fn add_targets(parsed: &ParsedModule, target: Node, bound: &mut BTreeSet<String>) {
    match target.kind() {
        "identifier" => {
            bound.insert(parsed.node_text(target).to_string());
        }
        "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
        | "list_splat_pattern" | "list_splat" | "parenthesized_expression"
        | "as_pattern_target" => {
            let mut cursor = target.walk();
            let children: Vec<Node> = target.named_children(&mut cursor).collect();
            if children.is_empty() && target.kind() == "as_pattern_target" {
                // Some grammar versions alias the identifier itself.
                let text = parsed.node_text(target);
                if is_identifier(text) {
                    bound.insert(text.to_string());
                }
            }
            for child in children {
                add_targets(parsed, child, bound);
            }
        }
        _ => {}
    }
}

/// `with open(p) as fh` binds `fh`.
fn add_as_pattern_alias(parsed: &ParsedModule, value: Node, bound: &mut BTreeSet<String>) {
    if value.kind() == "as_pattern" {
        if let Some(alias) = value.child_by_field_name("alias") {
            add_targets(parsed, alias, bound);
        }
    }
}

/// `except ValueError as err` binds `err`.
///
/// Accepts both tree shapes the grammar has used: an `as_pattern` child,
/// or a bare `as` token followed by the name.
fn add_except_name(parsed: &ParsedModule, clause: Node, bound: &mut BTreeSet<String>) {
    let mut cursor = clause.walk();
    let children: Vec<Node> = clause.children(&mut cursor).collect();
    for (i, child) in children.iter().enumerate() {
        if child.kind() == "as_pattern" {
            add_as_pattern_alias(parsed, *child, bound);
        } else if child.kind() == "as" {
            if let Some(name) = children[i + 1..].iter().find(|n| n.is_named()) {
                add_targets(parsed, *name, bound);
            }
        }
    }
}

/// Names bound by an import statement inside the function body.
fn add_import_names(parsed: &ParsedModule, stmt: Node, bound: &mut BTreeSet<String>) {
    let mut cursor = stmt.walk();
    for name in stmt.children_by_field_name("name", &mut cursor) {
        let local = match name.kind() {
            "aliased_import" => name
                .child_by_field_name("alias")
                .map(|a| parsed.node_text(a).to_string()),
            "dotted_name" => {
                let text = parsed.node_text(name);
                text.split('.').next().map(str::to_string)
            }
            _ => None,
        };
        if let Some(local) = local {
            bound.insert(local);
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::defs::gather;
    use std::path::Path;

    fn bindings_of(source: &str, name: &str) -> BindingSet {
        let parsed = ParsedModule::parse(Path::new("test.py"), source.to_string()).unwrap();
        let defs = gather(&parsed);
        let target = defs.find(name).expect("target should exist");
        collect(&parsed, target).unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bare_and_qualified_calls() {
        let b = bindings_of(
            r#"
def outer(x):
    a = helper(x)
    utils.slugify(a)
    pkg.sub.do()
    get_client().send()
    items[0].run()
    return "s".join([])
"#,
            "outer",
        );

        assert_eq!(b.bare_calls, set(&["helper", "get_client"]));
        assert_eq!(
            b.qualified_calls,
            vec![
                QualifiedCall {
                    root: "utils".to_string(),
                    chain: vec!["slugify".to_string()],
                },
                QualifiedCall {
                    root: "pkg".to_string(),
                    chain: vec!["sub".to_string(), "do".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_parameters_are_bound() {
        let b = bindings_of(
            "def f(a, /, b, *args, c, **kw):\n    return a\n",
            "f",
        );
        assert_eq!(b.bound_locals, set(&["a", "args", "b", "c", "kw"]));
    }

    #[test]
    fn test_assignment_targets() {
        let b = bindings_of(
            r#"
def f():
    a = 1
    b, (c, [d, *rest]) = stuff()
    e += 1
    g: int = 3
    h: str
    self_obj.attr = 4
    table[0] = 5
    if (w := compute()):
        pass
"#,
            "f",
        );
        assert_eq!(
            b.bound_locals,
            set(&["a", "b", "c", "d", "e", "g", "h", "rest", "w"])
        );
    }

    #[test]
    fn test_loop_comprehension_with_except_targets() {
        let b = bindings_of(
            r#"
def f(paths):
    for i, p in enumerate(paths):
        pass
    squares = [n * n for n in range(3)]
    lookup = {k: v for k, v in pairs()}
    with open(p) as fh, lock():
        pass
    try:
        risky()
    except ValueError as err:
        pass
"#,
            "f",
        );
        for name in ["paths", "i", "p", "squares", "n", "lookup", "k", "v", "fh", "err"] {
            assert!(b.is_bound(name), "{name} should be bound");
        }
        assert!(!b.is_bound("risky"));
        assert!(!b.is_bound("lock"));
    }

    #[test]
    fn test_nested_definitions_and_local_imports_bind() {
        let b = bindings_of(
            r#"
def f():
    import json
    import os.path
    from pkg import tool as t
    def inner():
        pass
    class Local:
        pass
    return inner()
"#,
            "f",
        );
        for name in ["json", "os", "t", "inner", "Local"] {
            assert!(b.is_bound(name), "{name} should be bound");
        }
        assert!(b.bare_calls.contains("inner"));
    }

    #[test]
    fn test_decorator_calls_are_collected() {
        let b = bindings_of(
            "@app.route('/')\n@retry(times=3)\ndef view():\n    return render()\n",
            "view",
        );
        assert!(b.bare_calls.contains("retry"));
        assert!(b.bare_calls.contains("render"));
        assert!(b
            .qualified_calls
            .iter()
            .any(|c| c.root == "app" && c.chain == vec!["route".to_string()]));
    }

    #[test]
    fn test_method_calls_rooted_at_self() {
        let b = bindings_of(
            "class A:\n    def run(self):\n        return self.helper()\n",
            "A.run",
        );
        assert!(b.is_bound("self"));
        assert_eq!(b.qualified_calls[0].root, "self");
    }
}
