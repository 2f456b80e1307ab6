//! Node Engine buildpack
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use node_engine::cli::{Cli, Commands};
use node_engine::error::NodeEngineResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> NodeEngineResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("node_engine=warn"),
        1 => EnvFilter::new("node_engine=info"),
        _ => EnvFilter::new("node_engine=debug"),
    };

    // Build log owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Detect(args) => node_engine::cli::commands::detect(args),
        Commands::Build(args) => node_engine::cli::commands::build(args),
        Commands::Resolve(args) => node_engine::cli::commands::resolve(args),
    }
}
