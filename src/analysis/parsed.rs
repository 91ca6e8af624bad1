//! A parsed Python module: source text plus its tree-sitter tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::python;

/// Holds a parsed tree-sitter tree and the text it was built from.
///
/// Kept separate from the gathered definitions so several analysis passes
/// (definitions, imports, bindings) can share one parse.
pub struct ParsedModule {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: String,
    /// The file path (for error reporting and provenance).
    pub path: PathBuf,
}

impl ParsedModule {
    /// Read and parse a file.
    ///
    /// Fails on unreadable files, non-UTF-8 content, and source that does
    /// not parse cleanly.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let source = String::from_utf8(bytes).map_err(|_| Error::Encoding {
            path: path.to_path_buf(),
        })?;
        Self::parse(path, source)
    }

    /// Parse in-memory source attributed to `path`.
    pub fn parse(path: &Path, source: String) -> Result<Self> {
        let analyzer = python::analyzer()?;
        let tree = analyzer.parse_tree(path, &source)?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(root.start_position().row + 1);
            return Err(Error::Syntax {
                path: path.to_path_buf(),
                line,
            });
        }

        Ok(Self {
            tree,
            source,
            path: path.to_path_buf(),
        })
    }

    /// The module node.
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

/// Line of the first ERROR or MISSING node, depth-first.
fn first_error_line(node: tree_sitter::Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_module() {
        let parsed = ParsedModule::parse(
            Path::new("mod.py"),
            "def f():\n    return 1\n".to_string(),
        )
        .unwrap();
        assert_eq!(parsed.root().kind(), "module");
        assert_eq!(parsed.root().named_child_count(), 1);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = ParsedModule::parse(
            Path::new("broken.py"),
            "def ok():\n    pass\n\ndef broken(:\n    pass\n".to_string(),
        )
        .err()
        .expect("broken source must not parse");
        match err {
            Error::Syntax { path, line } => {
                assert_eq!(path, PathBuf::from("broken.py"));
                assert!(line >= 4, "expected error near line 4, got {}", line);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_rejects_invalid_utf8() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("latin1.py");
        fs::write(&path, b"x = '\xe9'\n").unwrap();

        let err = ParsedModule::read(&path).err().unwrap();
        assert_eq!(err.kind(), "encoding");
    }
}
