//! Python language support using tree-sitter.

use std::path::Path;

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::error::{Error, Result};

/// Tree-sitter query for every call site below a node.
///
/// Captures:
/// - `callee`: the called expression (identifier, attribute chain, or anything else)
const CALL_QUERY: &str = r#"
(call function: (_) @callee) @call
"#;

/// Static storage for the Python analyzer.
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();

/// Get the shared Python analyzer, compiling its queries on first use.
pub fn analyzer() -> Result<&'static PythonAnalyzer> {
    PYTHON_ANALYZER.get_or_try_init(PythonAnalyzer::new)
}

/// Grammar handle plus precompiled queries.
///
/// `tree_sitter::Parser` is not `Sync`, so a fresh parser is created for
/// every parse; the language and queries are shared.
pub struct PythonAnalyzer {
    language: Language,
    call_query: Query,
}

impl PythonAnalyzer {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let call_query =
            Query::new(&language, CALL_QUERY).map_err(|e| Error::Parser(e.to_string()))?;
        Ok(Self {
            language,
            call_query,
        })
    }

    fn create_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| Error::Parser(e.to_string()))?;
        Ok(parser)
    }

    /// Parse Python source into a tree.
    ///
    /// Error recovery means a tree comes back even for broken source;
    /// callers decide whether ERROR nodes are acceptable.
    pub fn parse_tree(&self, path: &Path, source: &str) -> Result<tree_sitter::Tree> {
        let mut parser = self.create_parser()?;
        parser
            .parse(source, None)
            .ok_or_else(|| Error::Parser(format!("failed to parse {}", path.display())))
    }

    /// Callee expression of every call under `node`, in source order.
    pub fn callees<'tree>(&self, node: Node<'tree>, source: &[u8]) -> Vec<Node<'tree>> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.call_query, node, source);
        let names = self.call_query.capture_names();

        let mut callees = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if names[capture.index as usize] == "callee" {
                    callees.push(capture.node);
                }
            }
        }
        callees
    }
}

/// The `function_definition` inside an optional `decorated_definition`.
pub fn unwrap_decorated(node: Node<'_>) -> Node<'_> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}
