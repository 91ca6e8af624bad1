//! Verbatim source slices of function definitions.

use serde::{Deserialize, Serialize};

use crate::analysis::FunctionDef;
use crate::error::{Error, Result};

/// A contiguous run of source lines, 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Cut the lines of `def` out of `source`, decorators included.
pub fn slice_function(source: &str, def: &FunctionDef) -> Result<Slice> {
    let start_line = def.first_line();
    let end_line = match def.end_line {
        Some(end) => end,
        None => end_from_segment(source, def)?,
    };

    let lines: Vec<&str> = source.lines().collect();
    let end_line = end_line.min(lines.len()).max(start_line);
    let text = lines
        .get(start_line.saturating_sub(1)..end_line)
        .map(|run| run.join("\n"))
        .unwrap_or_default();

    Ok(Slice {
        text,
        start_line,
        end_line,
    })
}

/// Last line of the definition, counted from its byte range.
fn end_from_segment(source: &str, def: &FunctionDef) -> Result<usize> {
    let segment = source
        .get(def.span.byte_range())
        .ok_or_else(|| Error::SourceBoundary {
            name: def.qualified_name(),
        })?;
    let body = segment.trim_end_matches(['\n', '\r']);
    Ok(def.span.start_line + body.matches('\n').count())
}
