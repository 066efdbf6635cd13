//! Arkive CLI - Command-line utility for inspecting, testing and extracting
//! archives.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = !cli.quiet && !cli.json && progress::CliProgress::should_show();

    let succeeded = match &cli.command {
        cli::Commands::Extract(args) => {
            commands::extract::execute(args, &*formatter, show_progress)?
        }
        cli::Commands::Test(args) => commands::test::execute(args, &*formatter, show_progress)?,
        cli::Commands::List(args) => commands::list::execute(args, &*formatter)?,
        cli::Commands::Formats => commands::formats::execute(&*formatter)?,
        cli::Commands::Info(args) => commands::info::execute(args, &*formatter)?,
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            true
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Logs go to stderr; `RUST_LOG` overrides the flag-derived level.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
