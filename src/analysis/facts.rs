//! Fact structures extracted from the Python syntax tree.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: last_line(node),
            end_col: end.column + 1,
        }
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// 1-based line holding the last character of a node.
///
/// A node whose end point sits at column 0 ends on the previous line.
fn last_line(node: tree_sitter::Node) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

/// How a parameter binds its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    Positional,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

/// A single named parameter of a function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
}

/// A function or method definition, detached from its syntax tree.
///
/// Owned data only, so it can live in the project index after the tree
/// it came from has been dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    /// Owning class for methods.
    pub class_name: Option<String>,
    pub params: Vec<Parameter>,
    /// Decorator expressions, without the leading `@`.
    pub decorators: Vec<String>,
    /// 1-based line of each decorator.
    pub decorator_lines: Vec<usize>,
    /// 1-based line of the `def` header.
    pub line: usize,
    /// 1-based last line. `None` when the parser could not report it.
    pub end_line: Option<usize>,
    /// Byte span of the definition, decorators included.
    pub span: Span,
    pub is_async: bool,
}

impl FunctionDef {
    /// `Class.method` for methods, the bare name otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.class_name {
            Some(class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }

    /// First line of the definition, counting decorators.
    pub fn first_line(&self) -> usize {
        self.decorator_lines
            .iter()
            .copied()
            .chain(std::iter::once(self.line))
            .min()
            .unwrap_or(self.line)
    }

    /// Names of every parameter, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }
}

/// Join a module path and a symbol, tolerating the empty root module.
pub fn qualify(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", module, name)
    }
}
