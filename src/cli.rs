//! Command-line interface for pyslice.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_YAML};
use crate::error::Error;
use crate::extract::ExtractOptions;
use crate::index::ProjectIndex;
use crate::report::{self, IndexReport};
use crate::request::{ExtractRequest, Target};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NOT_FOUND: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Environment variable holding a log filter, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PYSLICE_LOG";

/// Extract Python functions and the project helpers they call.
///
/// pyslice slices a function's exact source, decorators included, and
/// statically resolves which project functions it calls through imports,
/// aliases, relative imports and re-exports. Nothing is executed.
#[derive(Parser)]
#[command(name = "pyslice")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a function and optionally resolve its helpers
    Extract(ExtractArgs),
    /// Answer one JSON request (stdin or file) with a JSON response
    Tool(ToolArgs),
    /// Build the project index and report what it contains
    Index(IndexArgs),
    /// Write a default pyslice.yaml
    Init(InitArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Pretty,
    Json,
}

/// Arguments for the extract command.
#[derive(Parser)]
pub struct ExtractArgs {
    /// Dotted path such as `pkg.mod.func` or `pkg.mod.Class.method`.
    /// With --file, just `func` or `Class.method`.
    pub function_path: String,

    /// Project root
    #[arg(short, long, default_value = ".")]
    pub base: PathBuf,

    /// Read the target from this file instead of mapping FUNCTION_PATH to one.
    /// Relative paths are taken from the working directory.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Resolve the project functions the target calls
    #[arg(long)]
    pub helpers: bool,

    /// Expand each helper into its own extraction (implies --helpers)
    #[arg(long)]
    pub detailed: bool,

    /// Expand helpers of helpers too (implies --detailed)
    #[arg(long)]
    pub recursive: bool,

    /// Match unproven calls by name across the project
    #[arg(long)]
    pub aggressive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: Format,

    /// Path to config YAML file (default: auto-discover in the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ExtractArgs {
    fn request(&self) -> anyhow::Result<ExtractRequest> {
        let cwd = std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("reading working directory: {}", e))?;
        Ok(self.request_in(&cwd))
    }

    /// Build the request, taking a relative `--file` from `cwd`.
    fn request_in(&self, cwd: &Path) -> ExtractRequest {
        let target = match &self.file {
            Some(file) => Target::File {
                file: cwd.join(file),
                name: self.function_path.clone(),
            },
            None => Target::FunctionPath(self.function_path.clone()),
        };
        let detailed = self.detailed || self.recursive;
        ExtractRequest {
            target,
            base_path: self.base.clone(),
            options: ExtractOptions {
                include_helpers: self.helpers || detailed,
                detailed,
                recursive: self.recursive,
                aggressive: self.aggressive,
            },
        }
    }
}

/// Arguments for the tool command.
#[derive(Parser)]
pub struct ToolArgs {
    /// JSON request file (default: stdin)
    #[arg(short, long)]
    pub request: Option<PathBuf>,

    /// Path to config YAML file (default: auto-discover in base_path)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the index command.
#[derive(Parser)]
pub struct IndexArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print every indexed qualified name
    #[arg(short, long)]
    pub list: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: Format,

    /// Path to config YAML file (default: auto-discover in the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "pyslice.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Install the stderr log subscriber.
///
/// `PYSLICE_LOG` wins, then `RUST_LOG`, then the -v/-q flags.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn exit_code_for(err: &Error) -> i32 {
    if err.is_not_found() {
        EXIT_NOT_FOUND
    } else {
        EXIT_ERROR
    }
}

fn load_config(explicit: Option<&Path>, root: &Path) -> Option<Config> {
    match Config::discover(explicit, root) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    let Some(config) = load_config(args.config.as_deref(), &args.base) else {
        return Ok(EXIT_ERROR);
    };
    let extractor = config.extractor()?;

    match extractor.run(&args.request()?) {
        Ok(extraction) => {
            match args.format {
                Format::Json => report::write_json(&extraction)?,
                Format::Pretty => report::write_pretty(&extraction),
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            match args.format {
                Format::Json => report::write_error_json(&e)?,
                Format::Pretty => report::write_error_pretty(&e),
            }
            Ok(exit_code_for(&e))
        }
    }
}

/// Run the tool command. Every outcome is printed as JSON on stdout.
pub fn run_tool(args: &ToolArgs) -> anyhow::Result<i32> {
    let text = match &args.request {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let request = match ExtractRequest::from_json(&text) {
        Ok(request) => request,
        Err(e) => {
            report::write_error_json(&e)?;
            return Ok(EXIT_ERROR);
        }
    };

    let config = match Config::discover(args.config.as_deref(), &request.base_path) {
        Ok(config) => config,
        Err(e) => {
            report::write_error_json(&e)?;
            return Ok(EXIT_ERROR);
        }
    };

    let result = config.extractor().and_then(|x| x.run(&request));
    match result {
        Ok(extraction) => {
            report::write_json(&extraction)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            report::write_error_json(&e)?;
            Ok(exit_code_for(&e))
        }
    }
}

/// Run the index command.
pub fn run_index(args: &IndexArgs) -> anyhow::Result<i32> {
    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let Some(config) = load_config(args.config.as_deref(), &root) else {
        return Ok(EXIT_ERROR);
    };

    let index = ProjectIndex::build(&root, &config.walk_options()?);
    let summary = IndexReport::new(&index, args.list);
    match args.format {
        Format::Json => report::write_index_json(&summary)?,
        Format::Pretty => report::write_index_pretty(&summary),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it, pass --force, or use --output to pick another path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_CONFIG_YAML) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to add project-specific exclusions", args.output.display());
    println!("  2. Run: pyslice extract pkg.module.function --helpers");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_flags_imply_each_other() {
        let cli = Cli::try_parse_from([
            "pyslice",
            "extract",
            "pkg.a.outer",
            "--base",
            "/proj",
            "--recursive",
            "-f",
            "json",
        ])
        .unwrap();
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.format, Format::Json);

        let request = args.request().unwrap();
        assert_eq!(request.target, Target::FunctionPath("pkg.a.outer".to_string()));
        assert_eq!(request.base_path, PathBuf::from("/proj"));
        assert!(request.options.include_helpers);
        assert!(request.options.detailed);
        assert!(request.options.recursive);
        assert!(!request.options.aggressive);
    }

    #[test]
    fn test_extract_with_file() {
        let cli = Cli::try_parse_from([
            "pyslice", "extract", "Widget.render", "--file", "ui/widget.py", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let request = args.request_in(Path::new("/work"));
        assert_eq!(
            request.target,
            Target::File {
                file: PathBuf::from("/work/ui/widget.py"),
                name: "Widget.render".to_string(),
            }
        );
        assert!(!request.options.include_helpers);
    }

    #[test]
    fn test_relative_file_is_taken_from_working_directory() {
        let cli = Cli::try_parse_from([
            "pyslice", "extract", "f", "--file", "src/m.py", "--base", "/proj",
        ])
        .unwrap();
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };

        let request = args.request_in(Path::new("/home/dev/proj"));
        let resolved = request.resolve_target().unwrap();
        assert_eq!(resolved.file, PathBuf::from("/home/dev/proj/src/m.py"));
        assert_eq!(request.base_path, PathBuf::from("/proj"));

        let cli = Cli::try_parse_from([
            "pyslice", "extract", "f", "--file", "/abs/m.py", "--base", "/proj",
        ])
        .unwrap();
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        // Absolute paths are kept as given.
        assert_eq!(
            args.request_in(Path::new("/home/dev")).resolve_target().unwrap().file,
            PathBuf::from("/abs/m.py")
        );
    }

    #[test]
    fn test_exit_codes() {
        let not_found = Error::ModuleNotFound {
            function_path: "a.b".to_string(),
            tried: vec![],
        };
        assert_eq!(exit_code_for(&not_found), EXIT_NOT_FOUND);
        assert_eq!(
            exit_code_for(&Error::InvalidRequest("x".to_string())),
            EXIT_ERROR
        );
    }
}
