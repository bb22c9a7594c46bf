//! CLI command implementations
//!
//! - `generate`: generate and check runs over a project
//! - `schema`: JSON schemas of the input formats
//! - `status`: stale declaration files and orphaned units
//! - `util`: shared output helpers

pub mod generate;
pub mod schema;
pub mod status;
pub mod util;

pub use generate::{cmd_check, cmd_generate};
pub use schema::cmd_schema;
pub use status::cmd_status;

use clap::{Parser, Subcommand, ValueEnum};
use declgen::VERSION;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "declgen",
    version = VERSION,
    about = "Generate concrete types, builders and converters from declarations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate every declaration under a path
    Generate(GenerateArgs),

    /// Run generation without writing files
    Check {
        /// Declaration file or directory
        #[arg(value_name = "PATH", default_value = ".")]
        input: PathBuf,

        /// Configuration file (default: nearest declgen.yaml)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value = "declarations")]
        kind: SchemaKind,
    },

    /// Show stale declaration files and orphaned generated files
    Status {
        #[arg(value_name = "PATH", default_value = ".")]
        input: PathBuf,

        #[arg(long, short)]
        config: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Declaration file or directory
    #[arg(value_name = "PATH", default_value = ".")]
    pub input: PathBuf,

    /// Configuration file (default: nearest declgen.yaml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output directory, overriding the configuration
    #[arg(long, short, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Worker threads
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Write generated code as emitted
    #[arg(long)]
    pub no_format: bool,

    /// Leave out the provenance header
    #[arg(long)]
    pub no_provenance: bool,

    /// Path generated code uses to reach the runtime module
    #[arg(long, value_name = "PATH")]
    pub runtime_path: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// Declaration files (*.decl.yaml)
    Declarations,
    /// declgen.yaml
    Config,
    /// .declgen_meta.yaml
    Meta,
}
