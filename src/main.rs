//! declgen CLI
//!
//! Commands:
//!   generate - Generate units from declaration files
//!   check    - Generate without writing
//!   schema   - Print JSON schemas
//!   status   - Show stale declaration files

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Generate(args) => cli::cmd_generate(args),
        Command::Check {
            input,
            config,
            json,
        } => cli::cmd_check(input, config.as_deref(), *json),
        Command::Schema { kind } => cli::cmd_schema(*kind),
        Command::Status {
            input,
            config,
            json,
        } => cli::cmd_status(input, config.as_deref(), *json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
