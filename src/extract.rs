//! The extraction pipeline: target lookup, slicing, helper resolution and
//! nested expansion.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::{self, bindings, qualify, ParsedModule};
use crate::error::{Error, Result};
use crate::index::{IndexCache, ProjectIndex};
use crate::request::ExtractRequest;
use crate::resolve::Resolver;
use crate::slice::slice_function;
use crate::walk::{self, WalkOptions};

/// Default limit on nested helper expansion.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// What to do beyond slicing the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Resolve the functions the target calls.
    pub include_helpers: bool,
    /// Expand each helper into a nested extraction.
    pub detailed: bool,
    /// Let nested extractions resolve and expand their own helpers.
    pub recursive: bool,
    /// Fall back to project-wide same-name matches for unproven calls.
    pub aggressive: bool,
}

impl ExtractOptions {
    /// Options for a helper expanded from an extraction made with `self`.
    pub fn nested(self) -> Self {
        Self {
            include_helpers: self.recursive,
            detailed: self.recursive,
            recursive: self.recursive,
            aggressive: self.aggressive,
        }
    }
}

/// Result of one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Provenance header followed by the verbatim source.
    pub code: String,
    pub start_line: usize,
    pub end_line: usize,
    /// The identifier that was asked for.
    pub function: String,
    /// Absolute path of the file the code came from.
    pub file: PathBuf,
    pub helpers: Vec<Helper>,
}

/// A resolved helper: its qualified path, or its full nested extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Helper {
    Path(String),
    Detailed(Box<Extraction>),
}

impl Helper {
    /// Qualified path for `Path` helpers, function name for expanded ones.
    pub fn name(&self) -> &str {
        match self {
            Helper::Path(path) => path,
            Helper::Detailed(extraction) => &extraction.function,
        }
    }
}

/// Expansion state for one top-level request.
struct Expansion {
    /// Qualified names on the path from the target to the current helper.
    ancestors: HashSet<String>,
    depth: usize,
}

/// Runs extractions against a shared index cache.
pub struct Extractor {
    cache: IndexCache,
    max_depth: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(IndexCache::with_options(WalkOptions::default()))
    }
}

impl Extractor {
    pub fn new(cache: IndexCache) -> Self {
        Self {
            cache,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deep nested helper expansion goes.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Run a normalized request end to end.
    pub fn run(&self, request: &ExtractRequest) -> Result<Extraction> {
        let target = request.resolve_target()?;
        self.extract(&target.file, &target.name, &request.base_path, request.options)
    }

    /// Extract `func_or_qualname` from `file`, resolving helpers against
    /// the project rooted at `base_path`.
    pub fn extract(
        &self,
        file: &Path,
        func_or_qualname: &str,
        base_path: &Path,
        options: ExtractOptions,
    ) -> Result<Extraction> {
        let root = base_path
            .canonicalize()
            .map_err(|e| Error::io(base_path, e))?;
        let mut expansion = Expansion {
            ancestors: HashSet::new(),
            depth: 0,
        };
        self.extract_in(file, func_or_qualname, &root, options, &mut expansion)
    }

    fn extract_in(
        &self,
        file: &Path,
        func_or_qualname: &str,
        root: &Path,
        options: ExtractOptions,
        expansion: &mut Expansion,
    ) -> Result<Extraction> {
        let file = file.canonicalize().map_err(|e| Error::io(file, e))?;
        let parsed = ParsedModule::read(&file)?;
        let defs = analysis::gather(&parsed);

        let target = defs
            .find(func_or_qualname)
            .ok_or_else(|| Error::FunctionNotFound {
                name: func_or_qualname.to_string(),
                file: file.clone(),
                available: defs.available(),
            })?;

        let slice = slice_function(&parsed.source, &target.def)?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let code = format!(
            "# Extracted from {}:{}-{}\n{}",
            file_name, slice.start_line, slice.end_line, slice.text
        );

        let mut helpers = Vec::new();
        if options.include_helpers {
            let module = walk::module_qualname(root, &file)?;
            let index = self.cache.get_or_build(root)?;
            let aliases = analysis::alias_maps(&parsed, &module, walk::is_package_init(&file));
            let calls = bindings::collect(&parsed, target)?;
            let local_functions: BTreeSet<String> =
                defs.functions.names().map(str::to_string).collect();
            let target_name = target.def.qualified_name();

            let resolver = Resolver {
                index: &index,
                aliases: &aliases,
                module: &module,
                local_functions: &local_functions,
                target: &target_name,
                aggressive: options.aggressive,
            };
            let paths = resolver.resolve(&calls);
            tracing::debug!(
                function = %qualify(&module, &target_name),
                helpers = paths.len(),
                "resolved helpers"
            );

            expansion.ancestors.insert(qualify(&module, &target_name));
            for path in paths {
                helpers.push(self.expand(path, root, &index, options, expansion));
            }
        }

        Ok(Extraction {
            code,
            start_line: slice.start_line,
            end_line: slice.end_line,
            function: func_or_qualname.to_string(),
            file,
            helpers,
        })
    }

    /// Turn a resolved path into a helper entry, expanding it when asked.
    fn expand(
        &self,
        path: String,
        root: &Path,
        index: &ProjectIndex,
        options: ExtractOptions,
        expansion: &mut Expansion,
    ) -> Helper {
        if !options.detailed {
            return Helper::Path(path);
        }
        if expansion.depth >= self.max_depth {
            tracing::debug!(helper = %path, depth = expansion.depth, "expansion depth limit reached");
            return Helper::Path(path);
        }
        let Some(entry) = index.lookup(&path) else {
            return Helper::Path(path);
        };
        if !expansion.ancestors.insert(path.clone()) {
            tracing::trace!(helper = %path, "cycle back to an enclosing extraction");
            return Helper::Path(path);
        }

        expansion.depth += 1;
        let nested = self.extract_in(
            &entry.file,
            &entry.def.name,
            root,
            options.nested(),
            expansion,
        );
        expansion.depth -= 1;
        expansion.ancestors.remove(&path);

        match nested {
            Ok(extraction) => Helper::Detailed(Box::new(extraction)),
            Err(e) => {
                tracing::warn!(helper = %path, error = %e, "could not expand helper");
                Helper::Path(path)
            }
        }
    }
}
