//! Output formatting for pyslice results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the response contract consumed by tools and agents

use colored::*;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::extract::{Extraction, Helper};
use crate::index::{ProjectIndex, SkippedFile};

// =============================================================================
// JSON Format
// =============================================================================

/// Failure body returned in place of an `Extraction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    pub kind: String,
    /// Every top-level function and `Class.method` in the target file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
    /// Candidate files checked for a `function_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        let available = match err {
            Error::FunctionNotFound { available, .. } => Some(available.clone()),
            _ => None,
        };
        let tried = match err {
            Error::ModuleNotFound { tried, .. } => Some(
                tried
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect(),
            ),
            _ => None,
        };
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
            available,
            tried,
        }
    }
}

/// Summary of one index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub version: String,
    pub root: String,
    pub files_indexed: usize,
    pub functions: usize,
    pub skipped: Vec<SkippedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
}

impl IndexReport {
    pub fn new(index: &ProjectIndex, list_names: bool) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            root: index.root().display().to_string(),
            files_indexed: index.files_indexed(),
            functions: index.function_count(),
            skipped: index.diagnostics().to_vec(),
            names: list_names.then(|| index.qualified_names().map(str::to_string).collect()),
        }
    }
}

pub fn extraction_json(extraction: &Extraction) -> serde_json::Result<String> {
    serde_json::to_string_pretty(extraction)
}

pub fn error_json(err: &Error) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ErrorReport::from(err))
}

/// Write an extraction in JSON format.
pub fn write_json(extraction: &Extraction) -> anyhow::Result<()> {
    println!("{}", extraction_json(extraction)?);
    Ok(())
}

/// Write a failure in JSON format.
pub fn write_error_json(err: &Error) -> anyhow::Result<()> {
    println!("{}", error_json(err)?);
    Ok(())
}

pub fn write_index_json(report: &IndexReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write an extraction in pretty (human-readable) format.
pub fn write_pretty(extraction: &Extraction) {
    println!();
    print!("  ");
    print!("{}", "pyslice".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    write_extraction(extraction, 0);
}

fn write_extraction(extraction: &Extraction, depth: usize) {
    let indent = "  ".repeat(depth + 1);

    print!("{}{}", indent, extraction.function.bold());
    print!("  {}", extraction.file.display().to_string().blue());
    println!(
        "{}",
        format!(":{}-{}", extraction.start_line, extraction.end_line).dimmed()
    );
    println!();

    for line in extraction.code.lines() {
        if line.starts_with("# Extracted from ") {
            println!("{}  {}", indent, line.dimmed());
        } else {
            println!("{}  {}", indent, line);
        }
    }
    println!();

    if extraction.helpers.is_empty() {
        return;
    }

    println!(
        "{}{} ({}):",
        indent,
        "Helpers".bold(),
        extraction.helpers.len()
    );
    for helper in &extraction.helpers {
        match helper {
            Helper::Path(path) => println!("{}  {} {}", indent, "→".green(), path),
            Helper::Detailed(nested) => {
                println!("{}  {} {}", indent, "↳".green(), nested.function);
            }
        }
    }
    println!();

    for helper in &extraction.helpers {
        if let Helper::Detailed(nested) = helper {
            write_extraction(nested, depth + 1);
        }
    }
}

/// Write a failure in pretty format.
pub fn write_error_pretty(err: &Error) {
    eprintln!();
    eprint!("  {}", "✗ ".red());
    eprintln!("{}", err);

    if let Error::FunctionNotFound { available, .. } = err {
        if !available.is_empty() {
            eprintln!();
            eprintln!("  {} ({}):", "Available".bold(), available.len());
            for name in available {
                eprintln!("    {}", name);
            }
        }
    }
    if let Error::ModuleNotFound { tried, .. } = err {
        eprintln!();
        eprintln!("  {}", "Tried:".bold());
        for path in tried {
            eprintln!("    {}", path.display().to_string().dimmed());
        }
    }
    eprintln!();
}

/// Write an index summary in pretty format.
pub fn write_index_pretty(report: &IndexReport) {
    println!();
    print!("  ");
    print!("{}", "pyslice".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Root:      ".dimmed());
    println!("{}", report.root);
    print!("  {}", "Files:     ".dimmed());
    println!("{}", report.files_indexed);
    print!("  {}", "Functions: ".dimmed());
    println!("{}", report.functions);
    println!();

    if !report.skipped.is_empty() {
        println!("  {} ({}):", "Skipped".yellow(), report.skipped.len());
        for skipped in &report.skipped {
            println!("    {}", skipped.path.display().to_string().blue());
            println!("            {}", skipped.reason.dimmed());
        }
        println!();
    }

    if let Some(names) = &report.names {
        println!("  {} ({}):", "Functions".bold(), names.len());
        for name in names {
            println!("    {}", name);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extraction(helpers: Vec<Helper>) -> Extraction {
        Extraction {
            code: "# Extracted from a.py:1-2\ndef f():\n    g()".to_string(),
            start_line: 1,
            end_line: 2,
            function: "f".to_string(),
            file: PathBuf::from("/proj/pkg/a.py"),
            helpers,
        }
    }

    #[test]
    fn test_extraction_json_shape() {
        let nested = extraction(vec![]);
        let out = extraction(vec![
            Helper::Path("pkg.b.g".to_string()),
            Helper::Detailed(Box::new(nested)),
        ]);

        let value: serde_json::Value =
            serde_json::from_str(&extraction_json(&out).unwrap()).unwrap();
        assert_eq!(value["function"], "f");
        assert_eq!(value["file"], "/proj/pkg/a.py");
        assert_eq!(value["start_line"], 1);
        assert_eq!(value["helpers"][0], "pkg.b.g");
        assert_eq!(value["helpers"][1]["function"], "f");
        assert!(value["helpers"][1]["helpers"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_extraction_json_parses_back() {
        let out = extraction(vec![
            Helper::Path("pkg.b.g".to_string()),
            Helper::Detailed(Box::new(extraction(vec![]))),
        ]);
        let text = extraction_json(&out).unwrap();
        let back: Extraction = serde_json::from_str(&text).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn test_error_report_lists_available() {
        let err = Error::FunctionNotFound {
            name: "nope".to_string(),
            file: PathBuf::from("a.py"),
            available: vec!["K.m".to_string(), "f".to_string()],
        };
        let value: serde_json::Value = serde_json::from_str(&error_json(&err).unwrap()).unwrap();
        assert_eq!(value["kind"], "function_not_found");
        assert_eq!(value["available"], serde_json::json!(["K.m", "f"]));
        assert!(value.get("tried").is_none());
    }

    #[test]
    fn test_error_report_omits_empty_extras() {
        let report = ErrorReport::from(&Error::InvalidRequest("bad".to_string()));
        assert_eq!(report.kind, "invalid_request");
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("available").is_none());
        assert!(value.get("tried").is_none());
    }
}
