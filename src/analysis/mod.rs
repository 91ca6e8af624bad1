//! AST-backed analysis of Python modules.
//!
//! This module turns one source file into the facts the resolver needs:
//! - Definitions (top-level functions, direct class methods)
//! - Import alias maps (absolute and relative)
//! - Per-function bindings (calls made, names bound locally)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │ Source File │────▶│ ParsedModule │────▶│ defs::gather    │
//! └─────────────┘     │ (tree-sitter)│     │ imports::alias_ │
//!                     └──────────────┘     │ bindings::collect│
//!                                          └─────────────────┘
//!                                                   │
//!                                                   ▼
//!                     ┌──────────────┐     ┌─────────────────┐
//!                     │ ProjectIndex │────▶│ resolve (engine)│
//!                     └──────────────┘     └─────────────────┘
//! ```

pub mod bindings;
pub mod defs;
mod facts;
pub mod imports;
mod parsed;
pub mod python;

pub use bindings::{BindingSet, QualifiedCall};
pub use defs::{gather, DefNode, DefTable, ModuleDefs};
pub use facts::{qualify, FunctionDef, ParamKind, Parameter, Span};
pub use imports::{alias_maps, resolve_relative, AliasMaps};
pub use parsed::ParsedModule;
