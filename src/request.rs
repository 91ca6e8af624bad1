//! Request normalization and target location.
//!
//! Callers send one of three JSON shapes:
//!
//! ```json
//! {"function_path": "pkg.a.outer", "base_path": "/proj", "include_helpers": true}
//! {"params": {"function_path": "pkg.a.outer", "base_path": "/proj"}}
//! {"file_path": "/proj/pkg/a.py", "func_or_qualname": "outer", "base_path": "/proj"}
//! ```
//!
//! All of them become one [`ExtractRequest`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::extract::ExtractOptions;
use crate::walk::{PACKAGE_INIT, SOURCE_EXTENSION};

/// How the request names its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Dotted `module.function` or `module.Class.method`, relative to the
    /// project root.
    FunctionPath(String),
    /// A file and a `name` or `Class.method` inside it.
    File { file: PathBuf, name: String },
}

/// A normalized extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub target: Target,
    pub base_path: PathBuf,
    pub options: ExtractOptions,
}

/// A target pinned to a concrete file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub file: PathBuf,
    /// `name` or `Class.method`.
    pub name: String,
}

/// Wire form of a request, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub function_path: Option<String>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub func_or_qualname: Option<String>,
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    #[serde(default)]
    pub include_helpers: bool,
    #[serde(default)]
    pub detailed_functions: bool,
    #[serde(default, alias = "reursive_helper")]
    pub recursive_helper: bool,
    #[serde(default)]
    pub aggressive_fallback: bool,
}

impl RawRequest {
    /// Parse any accepted JSON shape.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::InvalidRequest(e.to_string()))?;
        Self::from_value(value)
    }

    /// Like [`RawRequest::from_json`], for an already-parsed value.
    pub fn from_value(value: Value) -> Result<Self> {
        let value = match value {
            Value::Object(mut map) if map.get("params").is_some_and(Value::is_object) => {
                map.remove("params").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(value).map_err(|e| Error::InvalidRequest(e.to_string()))
    }

    /// Validate and convert to the canonical request.
    ///
    /// `function_path` wins over `file_path`/`func_or_qualname` when both
    /// are present.
    pub fn normalize(self) -> Result<ExtractRequest> {
        let base_path = self
            .base_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::InvalidRequest("base_path is required".to_string()))?;

        let target = match (self.function_path, self.file_path, self.func_or_qualname) {
            (Some(path), _, _) => {
                validate_function_path(&path)?;
                Target::FunctionPath(path)
            }
            (None, Some(file), Some(name)) if !name.is_empty() => Target::File { file, name },
            _ => {
                return Err(Error::InvalidRequest(
                    "expected function_path, or file_path with func_or_qualname".to_string(),
                ))
            }
        };

        Ok(ExtractRequest {
            target,
            base_path,
            options: ExtractOptions {
                include_helpers: self.include_helpers,
                detailed: self.detailed_functions,
                recursive: self.recursive_helper,
                aggressive: self.aggressive_fallback,
            },
        })
    }
}

impl ExtractRequest {
    /// Parse and normalize a JSON request.
    pub fn from_json(text: &str) -> Result<Self> {
        RawRequest::from_json(text)?.normalize()
    }

    /// Pin the target to a file. Relative file paths are taken from the
    /// project root.
    pub fn resolve_target(&self) -> Result<ResolvedTarget> {
        match &self.target {
            Target::FunctionPath(path) => locate_target(&self.base_path, path),
            Target::File { file, name } => Ok(ResolvedTarget {
                file: if file.is_absolute() {
                    file.clone()
                } else {
                    self.base_path.join(file)
                },
                name: name.clone(),
            }),
        }
    }
}

fn validate_function_path(path: &str) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() < 2 || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(Error::InvalidRequest(format!(
            "function_path {:?} must look like module.function",
            path
        )));
    }
    Ok(())
}

/// Map a dotted `function_path` to a file and a name inside it.
///
/// Every segment but the last names the module; the last is the function.
/// When that file is missing, the module is tried as a package, then the
/// last two segments are read as `Class.method`.
pub fn locate_target(base: &Path, function_path: &str) -> Result<ResolvedTarget> {
    validate_function_path(function_path)?;
    let segments: Vec<&str> = function_path.split('.').collect();

    // (module segments, name) splits in preference order.
    let mut splits = vec![(
        &segments[..segments.len() - 1],
        segments[segments.len() - 1].to_string(),
    )];
    if segments.len() >= 3 {
        let n = segments.len();
        splits.push((
            &segments[..n - 2],
            format!("{}.{}", segments[n - 2], segments[n - 1]),
        ));
    }

    let mut tried = Vec::new();
    for (module, name) in splits {
        for file in module_files(base, module) {
            if file.is_file() {
                tracing::debug!(function_path, file = %file.display(), name = %name, "located target");
                return Ok(ResolvedTarget { file, name });
            }
            tried.push(file);
        }
    }

    Err(Error::ModuleNotFound {
        function_path: function_path.to_string(),
        tried,
    })
}

/// `mod.py`, then `mod/__init__.py`.
fn module_files(base: &Path, module: &[&str]) -> [PathBuf; 2] {
    let mut dir = base.to_path_buf();
    dir.extend(module);
    [dir.with_extension(SOURCE_EXTENSION), dir.join(PACKAGE_INIT)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_locate_module_file() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pkg/sub/mod.py");

        let target = locate_target(temp.path(), "pkg.sub.mod.func").unwrap();
        assert_eq!(target.file, temp.path().join("pkg/sub/mod.py"));
        assert_eq!(target.name, "func");
    }

    #[test]
    fn test_locate_package_init() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pkg/__init__.py");

        let target = locate_target(temp.path(), "pkg.func").unwrap();
        assert_eq!(target.file, temp.path().join("pkg/__init__.py"));
        assert_eq!(target.name, "func");
    }

    #[test]
    fn test_locate_class_method() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pkg/mod.py");

        let target = locate_target(temp.path(), "pkg.mod.Widget.render").unwrap();
        assert_eq!(target.file, temp.path().join("pkg/mod.py"));
        assert_eq!(target.name, "Widget.render");
    }

    #[test]
    fn test_locate_reports_every_candidate() {
        let temp = TempDir::new().unwrap();
        let err = locate_target(temp.path(), "a.b.c").unwrap_err();
        match err {
            Error::ModuleNotFound { tried, .. } => {
                assert_eq!(
                    tried,
                    vec![
                        temp.path().join("a/b.py"),
                        temp.path().join("a/b/__init__.py"),
                        temp.path().join("a.py"),
                        temp.path().join("a/__init__.py"),
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_malformed_function_path() {
        for bad in ["func", "pkg..func", ".func", "pkg."] {
            let err = locate_target(Path::new("/proj"), bad).unwrap_err();
            assert_eq!(err.kind(), "invalid_request", "{bad}");
        }
    }

    #[test]
    fn test_request_shapes_normalize_alike() {
        let flat = r#"{"function_path": "pkg.a.outer", "base_path": "/proj",
                       "include_helpers": true, "reursive_helper": true}"#;
        let wrapped = r#"{"params": {"function_path": "pkg.a.outer", "base_path": "/proj",
                          "include_helpers": true, "recursive_helper": true}}"#;

        let a = ExtractRequest::from_json(flat).unwrap();
        let b = ExtractRequest::from_json(wrapped).unwrap();
        assert_eq!(a, b);
        assert!(a.options.include_helpers);
        assert!(a.options.recursive);
        assert!(!a.options.detailed);
        assert!(!a.options.aggressive);
    }

    #[test]
    fn test_split_shape_resolves_relative_file() {
        let req = ExtractRequest::from_json(
            r#"{"file_path": "pkg/a.py", "func_or_qualname": "C.m", "base_path": "/proj"}"#,
        )
        .unwrap();
        let target = req.resolve_target().unwrap();
        assert_eq!(target.file, PathBuf::from("/proj/pkg/a.py"));
        assert_eq!(target.name, "C.m");
    }

    #[test]
    fn test_missing_fields_are_invalid() {
        for bad in [
            r#"{"function_path": "pkg.f"}"#,
            r#"{"base_path": "/proj"}"#,
            r#"{"file_path": "a.py", "base_path": "/proj"}"#,
            r#"[1, 2]"#,
            "not json",
        ] {
            let err = ExtractRequest::from_json(bad).unwrap_err();
            assert_eq!(err.kind(), "invalid_request", "{bad}");
        }
    }
}
