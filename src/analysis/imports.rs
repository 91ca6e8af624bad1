//! Import statement resolution into per-module alias maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::ParsedModule;

/// Local import names of one module, mapped to absolute dotted paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMaps {
    /// `import a.b as x` gives `x -> a.b`; `import a.b` gives `a -> a.b`.
    pub import_aliases: BTreeMap<String, String>,
    /// `from X import Y as Z` gives `Z -> X.Y`. Whether `X.Y` names a
    /// submodule or a symbol is decided later against the project index.
    pub from_names: BTreeMap<String, String>,
}

impl AliasMaps {
    /// Absolute module for the root of an attribute chain.
    ///
    /// Plain imports win; `from X import mod` covers submodules imported by
    /// name.
    pub fn module_for_root(&self, root: &str) -> Option<&str> {
        self.import_aliases
            .get(root)
            .or_else(|| self.from_names.get(root))
            .map(String::as_str)
    }
}

/// Build the alias maps for a module.
///
/// `this_module` is the importing module's qualified name and `is_package`
/// is true when the module is a package `__init__.py`. Only module-level
/// imports are considered, including those guarded by top-level
/// `if`/`try` blocks.
pub fn alias_maps(parsed: &ParsedModule, this_module: &str, is_package: bool) -> AliasMaps {
    let mut maps = AliasMaps::default();
    for stmt in module_level_imports(parsed.root()) {
        match stmt.kind() {
            "import_statement" => record_import(parsed, stmt, &mut maps),
            "import_from_statement" => {
                record_from_import(parsed, stmt, this_module, is_package, &mut maps)
            }
            _ => {}
        }
    }
    maps
}

/// Import statements at module level, in source order.
fn module_level_imports(root: Node<'_>) -> Vec<Node<'_>> {
    let mut found = Vec::new();
    collect_imports(root, &mut found);
    found
}

fn collect_imports<'tree>(node: Node<'tree>, found: &mut Vec<Node<'tree>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" | "import_from_statement" => found.push(child),
            // Guarded imports: `try: import x / except ImportError: ...`
            "if_statement" | "try_statement" | "elif_clause" | "else_clause"
            | "except_clause" | "except_group_clause" | "finally_clause" | "block" => {
                collect_imports(child, found)
            }
            _ => {}
        }
    }
}

fn record_import(parsed: &ParsedModule, stmt: Node, maps: &mut AliasMaps) {
    let mut cursor = stmt.walk();
    for name in stmt.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "dotted_name" => {
                let full = parsed.node_text(name);
                if let Some(first) = full.split('.').next() {
                    maps.import_aliases
                        .insert(first.to_string(), full.to_string());
                }
            }
            "aliased_import" => {
                let (Some(target), Some(alias)) = (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) else {
                    continue;
                };
                maps.import_aliases.insert(
                    parsed.node_text(alias).to_string(),
                    parsed.node_text(target).to_string(),
                );
            }
            _ => {}
        }
    }
}

fn record_from_import(
    parsed: &ParsedModule,
    stmt: Node,
    this_module: &str,
    is_package: bool,
    maps: &mut AliasMaps,
) {
    let Some(module_node) = stmt.child_by_field_name("module_name") else {
        return;
    };

    let base = match module_node.kind() {
        "relative_import" => {
            let (level, module) = relative_parts(parsed, module_node);
            resolve_relative(this_module, is_package, level, module.as_deref())
        }
        _ => Some(parsed.node_text(module_node).to_string()),
    };
    let Some(base) = base.filter(|b| !b.is_empty()) else {
        tracing::trace!(
            module = this_module,
            statement = parsed.node_text(stmt),
            "relative import escapes the package root"
        );
        return;
    };

    let mut cursor = stmt.walk();
    for name in stmt.children_by_field_name("name", &mut cursor) {
        let (imported, local) = match name.kind() {
            "dotted_name" => {
                let text = parsed.node_text(name);
                (text.to_string(), text.to_string())
            }
            "aliased_import" => {
                let (Some(target), Some(alias)) = (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) else {
                    continue;
                };
                (
                    parsed.node_text(target).to_string(),
                    parsed.node_text(alias).to_string(),
                )
            }
            _ => continue,
        };
        maps.from_names
            .insert(local, format!("{}.{}", base, imported));
    }
}

/// Dot count and optional module of a `relative_import` node.
fn relative_parts(parsed: &ParsedModule, node: Node) -> (usize, Option<String>) {
    let mut level = 0;
    let mut module = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => {
                level += parsed.node_text(child).chars().filter(|c| *c == '.').count()
            }
            "." => level += 1,
            "dotted_name" => module = Some(parsed.node_text(child).to_string()),
            _ => {}
        }
    }
    (level, module)
}

/// Resolve a relative import against the importing module.
///
/// Level 1 is the module's own package; each further level strips one
/// trailing segment. Returns `None` when the level climbs past the top
/// package.
///
/// ```
/// use pyslice::analysis::resolve_relative;
///
/// assert_eq!(resolve_relative("Pkg.sub.mod", false, 1, Some("x")).as_deref(), Some("Pkg.sub.x"));
/// assert_eq!(resolve_relative("Pkg.sub.mod", false, 2, None).as_deref(), Some("Pkg"));
/// assert_eq!(resolve_relative("Pkg.sub.mod", false, 3, None), None);
/// ```
pub fn resolve_relative(
    this_module: &str,
    is_package: bool,
    level: usize,
    module: Option<&str>,
) -> Option<String> {
    if level == 0 {
        return module.map(str::to_string);
    }

    let mut package: Vec<&str> = this_module.split('.').filter(|s| !s.is_empty()).collect();
    if !is_package {
        package.pop();
    }
    if level > package.len() {
        return None;
    }
    package.truncate(package.len() - (level - 1));

    let mut parts: Vec<&str> = package;
    if let Some(module) = module {
        parts.extend(module.split('.').filter(|s| !s.is_empty()));
    }
    Some(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn maps_for(source: &str, module: &str, is_package: bool) -> AliasMaps {
        let parsed = ParsedModule::parse(Path::new("test.py"), source.to_string()).unwrap();
        alias_maps(&parsed, module, is_package)
    }

    #[test]
    fn test_plain_imports() {
        let maps = maps_for(
            "import os\nimport pkg.sub.mod\nimport numpy as np, pkg.util as u\n",
            "app.main",
            false,
        );
        assert_eq!(maps.import_aliases["os"], "os");
        assert_eq!(maps.import_aliases["pkg"], "pkg.sub.mod");
        assert_eq!(maps.import_aliases["np"], "numpy");
        assert_eq!(maps.import_aliases["u"], "pkg.util");
        assert!(maps.from_names.is_empty());
    }

    #[test]
    fn test_from_imports() {
        let maps = maps_for(
            "from pkg.utils import slugify, clean as scrub\nfrom pkg import (utils, other)\nfrom os.path import *\n",
            "app.main",
            false,
        );
        assert_eq!(maps.from_names["slugify"], "pkg.utils.slugify");
        assert_eq!(maps.from_names["scrub"], "pkg.utils.clean");
        assert_eq!(maps.from_names["utils"], "pkg.utils");
        assert_eq!(maps.from_names["other"], "pkg.other");
        assert_eq!(maps.from_names.len(), 4);
    }

    #[test]
    fn test_relative_imports() {
        let maps = maps_for(
            "from . import x\nfrom .. import y\nfrom .sibling import z as zz\nfrom ..core.io import read\nfrom ... import too_far\n",
            "Pkg.sub.mod",
            false,
        );
        assert_eq!(maps.from_names["x"], "Pkg.sub.x");
        assert_eq!(maps.from_names["y"], "Pkg.y");
        assert_eq!(maps.from_names["zz"], "Pkg.sub.sibling.z");
        assert_eq!(maps.from_names["read"], "Pkg.core.io.read");
        assert!(!maps.from_names.contains_key("too_far"));
    }

    #[test]
    fn test_relative_import_in_package_init() {
        let maps = maps_for("from .impl import helper\nfrom . import sibling\n", "pkg", true);
        assert_eq!(maps.from_names["helper"], "pkg.impl.helper");
        assert_eq!(maps.from_names["sibling"], "pkg.sibling");
    }

    #[test]
    fn test_top_level_module_cannot_go_relative() {
        let maps = maps_for("from . import x\n", "script", false);
        assert!(maps.from_names.is_empty());
    }

    #[test]
    fn test_guarded_imports_and_function_imports() {
        let maps = maps_for(
            r#"
from __future__ import annotations
try:
    import ujson as json
except ImportError:
    import json
if TYPE_CHECKING:
    from pkg.types import Model

def f():
    import hidden
"#,
            "app.main",
            false,
        );
        assert_eq!(maps.import_aliases["json"], "json");
        assert_eq!(maps.from_names["Model"], "pkg.types.Model");
        assert!(!maps.import_aliases.contains_key("hidden"));
        assert!(!maps.from_names.contains_key("annotations"));
    }

    #[test]
    fn test_module_for_root_prefers_plain_import() {
        let mut maps = AliasMaps::default();
        maps.import_aliases
            .insert("utils".to_string(), "a.utils".to_string());
        maps.from_names
            .insert("utils".to_string(), "b.utils".to_string());
        maps.from_names
            .insert("other".to_string(), "b.other".to_string());

        assert_eq!(maps.module_for_root("utils"), Some("a.utils"));
        assert_eq!(maps.module_for_root("other"), Some("b.other"));
        assert_eq!(maps.module_for_root("missing"), None);
    }
}
