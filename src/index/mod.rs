//! Project-wide function index.
//!
//! One walk over the project root produces two lookup tables for
//! top-level functions:
//! - `by_name`: bare name to every definition with that name
//! - `by_qualified`: `module.function` to exactly one definition
//!
//! Methods are not indexed. Attribute calls do not say which object's
//! method they mean, so methods are only reachable as explicit targets.

mod cache;

pub use cache::{IndexCache, DEFAULT_CAPACITY};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, qualify, FunctionDef, ParsedModule};
use crate::walk::{self, WalkOptions};

/// Upper bound on `from X import Y` hops followed through re-exports.
pub const MAX_REEXPORT_HOPS: usize = 8;

/// A top-level function and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFunction {
    pub file: PathBuf,
    pub module: String,
    pub def: FunctionDef,
}

impl IndexedFunction {
    /// `module.function`.
    pub fn qualified_name(&self) -> String {
        qualify(&self.module, &self.def.name)
    }
}

/// A file left out of the index, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Symbol tables for one project root.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    root: PathBuf,
    by_name: BTreeMap<String, Vec<IndexedFunction>>,
    by_qualified: BTreeMap<String, IndexedFunction>,
    /// `module -> local name -> absolute target` from each module's
    /// `from` imports.
    reexports: BTreeMap<String, BTreeMap<String, String>>,
    /// Files left out of the tables.
    diagnostics: Vec<SkippedFile>,
    files_indexed: usize,
}

/// Everything the index keeps from one parsed file.
struct IndexedFile {
    path: PathBuf,
    module: String,
    is_package: bool,
    functions: Vec<FunctionDef>,
    reexports: BTreeMap<String, String>,
}

impl ProjectIndex {
    /// Walk `root` and index every parseable file.
    ///
    /// Files are parsed in parallel and merged in walk order, so the result
    /// does not depend on scheduling. Unreadable or unparseable files are
    /// recorded in `diagnostics` and otherwise ignored.
    pub fn build(root: &Path, options: &WalkOptions) -> Self {
        let files = walk::python_files(root, options);
        tracing::debug!(root = %root.display(), files = files.len(), "indexing project");

        let outcomes: Vec<Result<IndexedFile, SkippedFile>> =
            files.par_iter().map(|path| index_file(root, path)).collect();

        let mut index = ProjectIndex {
            root: root.to_path_buf(),
            ..Default::default()
        };
        let mut package_modules: HashSet<String> = HashSet::new();

        for outcome in outcomes {
            match outcome {
                Ok(file) => index.merge(file, &mut package_modules),
                Err(skipped) => {
                    tracing::warn!(
                        path = %skipped.path.display(),
                        reason = %skipped.reason,
                        "skipping file"
                    );
                    index.diagnostics.push(skipped);
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            files = index.files_indexed,
            functions = index.by_qualified.len(),
            skipped = index.diagnostics.len(),
            "index built"
        );
        index
    }

    fn merge(&mut self, file: IndexedFile, package_modules: &mut HashSet<String>) {
        self.files_indexed += 1;

        // A package `__init__.py` shadows a same-named sibling module.
        let shadowed = !file.is_package && package_modules.contains(&file.module);
        if file.is_package {
            package_modules.insert(file.module.clone());
        }

        for def in file.functions {
            let entry = IndexedFunction {
                file: file.path.clone(),
                module: file.module.clone(),
                def,
            };
            let qualified = entry.qualified_name();
            self.by_name
                .entry(entry.def.name.clone())
                .or_default()
                .push(entry.clone());
            if !shadowed {
                self.by_qualified.insert(qualified, entry);
            }
        }

        if !file.reexports.is_empty() && !shadowed {
            self.reexports.insert(file.module, file.reexports);
        }
    }

    /// The root this index was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Definition for an exact `module.function` path.
    pub fn lookup(&self, qualified: &str) -> Option<&IndexedFunction> {
        self.by_qualified.get(qualified)
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.by_qualified.contains_key(qualified)
    }

    /// Every top-level function called `name`, in walk order.
    pub fn by_name(&self, name: &str) -> &[IndexedFunction] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve `module.symbol` to a definition, following re-exports.
    ///
    /// `pkg.helper` resolves to `pkg.impl.helper` when `pkg/__init__.py`
    /// does `from .impl import helper`. Gives up after
    /// `MAX_REEXPORT_HOPS` or on a cycle.
    pub fn follow(&self, qualified: &str) -> Option<&IndexedFunction> {
        let mut current = qualified.to_string();
        let mut seen = HashSet::new();

        for _ in 0..=MAX_REEXPORT_HOPS {
            if let Some(found) = self.by_qualified.get(&current) {
                return Some(found);
            }
            if !seen.insert(current.clone()) {
                return None;
            }
            let (module, symbol) = current.rsplit_once('.')?;
            let target = self.reexports.get(module)?.get(symbol)?;
            tracing::trace!(from = %current, to = %target, "following re-export");
            current = target.clone();
        }
        None
    }

    /// All indexed qualified names, sorted.
    pub fn qualified_names(&self) -> impl Iterator<Item = &str> {
        self.by_qualified.keys().map(String::as_str)
    }

    pub fn function_count(&self) -> usize {
        self.by_qualified.len()
    }

    pub fn files_indexed(&self) -> usize {
        self.files_indexed
    }

    /// Files that were skipped during the build.
    pub fn diagnostics(&self) -> &[SkippedFile] {
        &self.diagnostics
    }
}

fn index_file(root: &Path, path: &Path) -> Result<IndexedFile, SkippedFile> {
    let skipped = |reason: String| SkippedFile {
        path: path.to_path_buf(),
        reason,
    };

    let module = walk::module_qualname(root, path).map_err(|e| skipped(e.to_string()))?;
    let parsed = ParsedModule::read(path).map_err(|e| skipped(e.to_string()))?;
    let is_package = walk::is_package_init(path);

    let defs = analysis::gather(&parsed);
    let functions = defs
        .functions
        .iter()
        .map(|(_, node)| node.def.clone())
        .collect();
    let reexports = analysis::alias_maps(&parsed, &module, is_package).from_names;

    Ok(IndexedFile {
        path: path.to_path_buf(),
        module,
        is_package,
        functions,
        reexports,
    })
}
