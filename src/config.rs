//! Optional YAML configuration.
//!
//! Looked up as `pyslice.yaml` or `.pyslice.yaml` in the project root
//! unless a path is given explicitly. Every field has a default.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::{Extractor, DEFAULT_MAX_DEPTH};
use crate::index::{self, IndexCache};
use crate::walk::WalkOptions;

/// File names checked by [`Config::discover`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["pyslice.yaml", ".pyslice.yaml"];

/// Tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Directory names skipped in addition to the built-in set.
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    /// Glob patterns, relative to the project root, for files to skip
    /// (e.g. "**/generated/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Number of project indexes kept in memory (default: 4)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Maximum nesting of expanded helpers (default: 16)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_cache_capacity() -> usize {
    index::DEFAULT_CAPACITY
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            excluded_paths: Vec::new(),
            cache_capacity: default_cache_capacity(),
            max_depth: default_max_depth(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse and validate YAML text. An empty document gives the defaults.
    pub fn parse_str(yaml: &str) -> Result<Self> {
        let blank = yaml
            .lines()
            .map(str::trim)
            .all(|l| l.is_empty() || l.starts_with('#'));
        let config: Config = if blank {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// First config file found in `root`, if any.
    pub fn find(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    /// Load the explicit file when given, else the one found in `root`,
    /// else the defaults.
    pub fn discover(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find(root),
        };
        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::parse_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check value ranges and glob syntax.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be at least 1".to_string()));
        }
        self.walk_options()?;
        Ok(())
    }

    pub fn walk_options(&self) -> Result<WalkOptions> {
        WalkOptions::new(&self.exclude_dirs, &self.excluded_paths)
    }

    /// An extractor set up from this config.
    pub fn extractor(&self) -> Result<Extractor> {
        let capacity = NonZeroUsize::new(self.cache_capacity)
            .ok_or_else(|| Error::Config("cache_capacity must be at least 1".to_string()))?;
        let cache = IndexCache::new(capacity, self.walk_options()?);
        Ok(Extractor::new(cache).with_max_depth(self.max_depth))
    }
}

/// Commented default config written by `pyslice init`.
pub const DEFAULT_CONFIG_YAML: &str = include_str!("templates/pyslice.yaml");
