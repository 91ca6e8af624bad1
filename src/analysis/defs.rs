//! Definition gathering: top-level functions and direct class methods.

use tree_sitter::Node;

use super::facts::{FunctionDef, ParamKind, Parameter, Span};
use super::python::unwrap_decorated;
use super::ParsedModule;

/// A gathered definition paired with its syntax node.
#[derive(Debug, Clone)]
pub struct DefNode<'tree> {
    pub def: FunctionDef,
    /// The `function_definition` node.
    pub node: Node<'tree>,
    /// The `decorated_definition` wrapper when decorators are present,
    /// otherwise the same node as `node`.
    pub outer: Node<'tree>,
}

/// Insertion-ordered name table with Python rebinding semantics: a later
/// definition replaces the value but keeps the original position.
#[derive(Debug, Clone)]
pub struct DefTable<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for DefTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> DefTable<T> {
    pub fn insert(&mut self, name: String, value: T) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Definitions of one module.
#[derive(Debug, Default)]
pub struct ModuleDefs<'tree> {
    /// Top-level `def` and `async def`.
    pub functions: DefTable<DefNode<'tree>>,
    /// `class name -> method name -> definition`, direct methods only.
    pub classes: DefTable<DefTable<DefNode<'tree>>>,
}

impl<'tree> ModuleDefs<'tree> {
    /// Look up a target by `name` or `Class.method`.
    ///
    /// A bare name that is not a top-level function falls back to the first
    /// class (in declaration order) that declares a method of that name.
    pub fn find(&self, func_or_qualname: &str) -> Option<&DefNode<'tree>> {
        if let Some((class, method)) = func_or_qualname.split_once('.') {
            return self.classes.get(class)?.get(method);
        }
        self.functions.get(func_or_qualname).or_else(|| {
            self.classes
                .iter()
                .find_map(|(_, methods)| methods.get(func_or_qualname))
        })
    }

    /// Every top-level name plus every `Class.method`, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.names().map(str::to_string).collect();
        for (class, methods) in self.classes.iter() {
            names.extend(methods.names().map(|m| format!("{}.{}", class, m)));
        }
        names.sort();
        names
    }
}

/// Gather top-level functions and class method tables.
///
/// Nested classes and inherited methods are not visited.
pub fn gather<'tree>(parsed: &'tree ParsedModule) -> ModuleDefs<'tree> {
    let mut defs = ModuleDefs::default();
    let root = parsed.root();
    let mut cursor = root.walk();

    for child in root.named_children(&mut cursor) {
        let inner = unwrap_decorated(child);
        match inner.kind() {
            "function_definition" => {
                if let Some(def) = function_def(parsed, child, None) {
                    defs.functions.insert(def.def.name.clone(), def);
                }
            }
            "class_definition" => {
                let Some(class_name) = inner
                    .child_by_field_name("name")
                    .map(|n| parsed.node_text(n).to_string())
                else {
                    continue;
                };
                let methods = class_methods(parsed, inner, &class_name);
                defs.classes.insert(class_name, methods);
            }
            _ => {}
        }
    }

    defs
}

fn class_methods<'tree>(
    parsed: &'tree ParsedModule,
    class_node: Node<'tree>,
    class_name: &str,
) -> DefTable<DefNode<'tree>> {
    let mut methods = DefTable::default();
    let Some(body) = class_node.child_by_field_name("body") else {
        return methods;
    };

    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        if unwrap_decorated(member).kind() != "function_definition" {
            continue;
        }
        if let Some(def) = function_def(parsed, member, Some(class_name)) {
            methods.insert(def.def.name.clone(), def);
        }
    }
    methods
}

/// Build a `DefNode` from a `function_definition` or its decorated wrapper.
pub fn function_def<'tree>(
    parsed: &'tree ParsedModule,
    outer: Node<'tree>,
    class_name: Option<&str>,
) -> Option<DefNode<'tree>> {
    let node = unwrap_decorated(outer);
    let name = parsed.node_text(node.child_by_field_name("name")?).to_string();

    let mut decorators = Vec::new();
    let mut decorator_lines = Vec::new();
    if outer.kind() == "decorated_definition" {
        let mut cursor = outer.walk();
        for dec in outer
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "decorator")
        {
            let text = parsed.node_text(dec).trim_start_matches('@').trim();
            decorators.push(text.to_string());
            decorator_lines.push(dec.start_position().row + 1);
        }
    }

    let params = node
        .child_by_field_name("parameters")
        .map(|p| parameters(parsed, p))
        .unwrap_or_default();

    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

    let span = Span::from_node(node);
    let end = Span::from_node(code_end(node));
    let mut outer_span = Span::from_node(outer);
    outer_span.end_byte = end.end_byte;
    outer_span.end_line = end.end_line;
    outer_span.end_col = end.end_col;

    Some(DefNode {
        def: FunctionDef {
            name,
            class_name: class_name.map(str::to_string),
            params,
            decorators,
            decorator_lines,
            line: span.start_line,
            end_line: Some(end.end_line),
            span: outer_span,
            is_async,
        },
        node,
        outer,
    })
}

/// The node whose end is the end of the last statement under `node`.
///
/// tree-sitter lets a block run over trailing indented comments, so the
/// walk skips `comment` children and descends through blocks, clauses
/// and nested definitions to the last real statement.
fn code_end(node: Node<'_>) -> Node<'_> {
    let mut cursor = node.walk();
    let last = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .last();
    let Some(last) = last else {
        return node;
    };
    let kind = last.kind();
    if node.kind() == "block"
        || kind == "block"
        || kind.ends_with("_clause")
        || kind.ends_with("_definition")
    {
        code_end(last)
    } else {
        node
    }
}

/// Parameter names with their binding kind.
///
/// Handles `/` and `*` separators plus typed and defaulted forms.
pub fn parameters(parsed: &ParsedModule, params: Node) -> Vec<Parameter> {
    let mut cursor = params.walk();
    let children: Vec<Node> = params.named_children(&mut cursor).collect();

    // Everything before a `/` is positional-only.
    let slash_at = children
        .iter()
        .position(|n| n.kind() == "positional_separator");

    let mut out = Vec::new();
    let mut after_star = false;
    for (i, child) in children.iter().enumerate() {
        let base_kind = if slash_at.is_some_and(|s| i < s) {
            ParamKind::PositionalOnly
        } else if after_star {
            ParamKind::KeywordOnly
        } else {
            ParamKind::Positional
        };

        match child.kind() {
            "keyword_separator" => after_star = true,
            "positional_separator" => {}
            _ => {
                if let Some((name, kind)) = parameter_name(parsed, *child) {
                    let kind = kind.unwrap_or(base_kind);
                    if kind == ParamKind::VarPositional {
                        after_star = true;
                    }
                    out.push(Parameter { name, kind });
                }
            }
        }
    }
    out
}

/// Name of one parameter node, plus its kind when the node itself decides it.
fn parameter_name(parsed: &ParsedModule, node: Node) -> Option<(String, Option<ParamKind>)> {
    match node.kind() {
        "identifier" => Some((parsed.node_text(node).to_string(), None)),
        "default_parameter" | "typed_default_parameter" => {
            let name = node.child_by_field_name("name")?;
            parameter_name(parsed, name)
        }
        "typed_parameter" => {
            let mut cursor = node.walk();
            let first = node.named_children(&mut cursor).next()?;
            parameter_name(parsed, first)
        }
        "list_splat_pattern" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).next()?;
            let (name, _) = parameter_name(parsed, inner)?;
            Some((name, Some(ParamKind::VarPositional)))
        }
        "dictionary_splat_pattern" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).next()?;
            let (name, _) = parameter_name(parsed, inner)?;
            Some((name, Some(ParamKind::VarKeyword)))
        }
        _ => None,
    }
}
