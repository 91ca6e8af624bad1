//! pyslice - static function slicing for Python source trees.
//!
//! Given a function inside a project, pyslice returns its exact source
//! (decorators included) and the set of project functions it calls. Calls
//! are bound through the module's own definitions, plain and aliased
//! imports, relative imports and package re-exports. Nothing is executed,
//! and a call whose binding cannot be proven is left out unless aggressive
//! fallback is requested.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `walk`: source discovery and module naming
//! - `analysis`: per-file facts (definitions, imports, bindings)
//! - `index`: project-wide function tables and their LRU cache
//! - `slice`: decorator-aware source slicing
//! - `resolve`: the helper resolution policy
//! - `extract`: the request pipeline and nested expansion
//! - `request`: request normalization and target location
//! - `config`: YAML configuration
//! - `report`: Output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use pyslice::{ExtractOptions, Extractor};
//!
//! let extractor = Extractor::default();
//! let out = extractor.extract(
//!     Path::new("proj/pkg/a.py"),
//!     "outer",
//!     Path::new("proj"),
//!     ExtractOptions { include_helpers: true, ..Default::default() },
//! )?;
//! for helper in &out.helpers {
//!     println!("{}", helper.name());
//! }
//! # Ok::<(), pyslice::Error>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod report;
pub mod request;
pub mod resolve;
pub mod slice;
pub mod walk;

pub use config::Config;
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extraction, Extractor, Helper};
pub use index::{IndexCache, IndexedFunction, ProjectIndex, SkippedFile};
pub use request::{locate_target, ExtractRequest, RawRequest, ResolvedTarget, Target};
pub use resolve::{resolve_helpers, Resolver};
pub use slice::{slice_function, Slice};
pub use walk::{module_qualname, python_files, WalkOptions};
