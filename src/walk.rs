//! Source file discovery and module naming.

use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use phf::phf_set;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Python source extension, without the dot.
pub const SOURCE_EXTENSION: &str = "py";

/// Package initializer file name.
pub const PACKAGE_INIT: &str = "__init__.py";

/// Directory names that never hold project sources.
pub static EXCLUDED_DIRS: phf::Set<&'static str> = phf_set! {
    ".git", "__pycache__", ".mypy_cache", ".pytest_cache", ".ruff_cache",
    "build", "dist", "site-packages", "venv", ".venv", "env", ".env",
    ".idea", ".vscode", "node_modules", ".tox", ".eggs",
    "venv-windows", "venv-linux",
};

/// Extra exclusions layered over `EXCLUDED_DIRS`.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    extra_dirs: Vec<String>,
    excluded_paths: Option<GlobSet>,
}

impl WalkOptions {
    /// Build options from extra directory names and glob patterns.
    ///
    /// Patterns match paths relative to the walk root, `/`-separated.
    pub fn new(extra_dirs: &[String], patterns: &[String]) -> Result<Self> {
        let excluded_paths = if patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in patterns {
                let glob = Glob::new(pattern)
                    .map_err(|e| Error::Config(format!("bad glob {:?}: {}", pattern, e)))?;
                builder.add(glob);
            }
            Some(
                builder
                    .build()
                    .map_err(|e| Error::Config(e.to_string()))?,
            )
        };
        Ok(Self {
            extra_dirs: extra_dirs.to_vec(),
            excluded_paths,
        })
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        EXCLUDED_DIRS.contains(name) || self.extra_dirs.iter().any(|d| d == name)
    }

    fn is_excluded_path(&self, rel: &str) -> bool {
        self.excluded_paths
            .as_ref()
            .is_some_and(|set| set.is_match(rel))
    }
}

/// Every `.py` file under `root`, sorted by path.
///
/// Unreadable entries are logged and skipped; the walk never aborts.
pub fn python_files(root: &Path, options: &WalkOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !options.is_excluded_dir(&name)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            continue;
        }
        if options.excluded_paths.is_some() {
            let rel = relative_slash_path(root, path);
            if options.is_excluded_path(&rel) {
                tracing::trace!(path = %rel, "excluded by config pattern");
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    files
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `path` is a package `__init__.py`.
pub fn is_package_init(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(PACKAGE_INIT)
}

/// Dotted module name of `file` relative to `root`.
///
/// `pkg/sub/mod.py` is `pkg.sub.mod`; `pkg/sub/__init__.py` is `pkg.sub`.
pub fn module_qualname(root: &Path, file: &Path) -> Result<String> {
    let rel = file.strip_prefix(root).map_err(|_| Error::OutsideRoot {
        path: file.to_path_buf(),
        root: root.to_path_buf(),
    })?;

    let rel: PathBuf = if is_package_init(rel) {
        rel.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        rel.with_extension("")
    };

    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("."))
}
