//! Error types for pyslice.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the extraction engine.
///
/// Only conditions that block the primary request live here. Calls that
/// cannot be bound to a project function are not errors; they are dropped
/// by the resolver.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reading {shown}: {source}", shown = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{shown} is not valid UTF-8", shown = .path.display())]
    Encoding { path: PathBuf },

    #[error("syntax error in {shown} near line {line}", shown = .path.display())]
    Syntax { path: PathBuf, line: usize },

    #[error("{shown} is not under project root {shown_root}", shown = .path.display(), shown_root = .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("function '{name}' not found in {shown}. Available: {available:?}", shown = .file.display())]
    FunctionNotFound {
        name: String,
        file: PathBuf,
        available: Vec<String>,
    },

    #[error("no source file for '{function_path}' (tried {tried:?})")]
    ModuleNotFound {
        function_path: String,
        tried: Vec<PathBuf>,
    },

    #[error("unable to determine where '{name}' ends in the source text")]
    SourceBoundary { name: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("parser setup failed: {0}")]
    Parser(String),
}

impl Error {
    /// Stable machine-readable name for the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io { .. } => "io",
            Error::Encoding { .. } => "encoding",
            Error::Syntax { .. } => "syntax",
            Error::OutsideRoot { .. } => "outside_root",
            Error::FunctionNotFound { .. } => "function_not_found",
            Error::ModuleNotFound { .. } => "module_not_found",
            Error::SourceBoundary { .. } => "source_boundary",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Config(_) => "config",
            Error::Parser(_) => "parser",
        }
    }

    /// Whether the caller asked for something that does not exist.
    ///
    /// These are the failures worth retrying with a corrected identifier.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::FunctionNotFound { .. } | Error::ModuleNotFound { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
