//! pyslice CLI entry point.

use clap::Parser;
use pyslice::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Extract(args) => cli::run_extract(args),
        Commands::Tool(args) => cli::run_tool(args),
        Commands::Index(args) => cli::run_index(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
