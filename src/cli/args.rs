//! CLI argument definitions using clap
//!
//! Commands:
//! - kite query --schema <path> --sql <text> [--config <path>] [--host <addr>]...
//! - kite dump <file>

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Kite - client for fragment-parallel queries
#[derive(Parser, Debug)]
#[command(name = "kite")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a query against fragment servers and print its rows
    Query(QueryArgs),

    /// Decode a vector container file and print its rows
    Dump {
        /// Container file (vectors plus offset footer)
        file: PathBuf,

        /// Minimum log severity: trace, info, warn, error, fatal
        #[arg(long)]
        log_level: Option<String>,
    },
}

/// Source file format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Parquet,
    Csv,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// JSON file with the output schema
    #[arg(long)]
    pub schema: PathBuf,

    /// SQL statement
    #[arg(long)]
    pub sql: String,

    /// Client configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fragment server host:port; repeat for several, overrides the config
    #[arg(long = "host")]
    pub hosts: Vec<String>,

    /// Run only this fragment
    #[arg(long)]
    pub fragment: Option<u32>,

    /// Number of fragments
    #[arg(long)]
    pub fragments: Option<u32>,

    #[arg(long, value_enum, default_value_t = Format::Parquet)]
    pub format: Format,

    /// CSV field delimiter
    #[arg(long, default_value = ",")]
    pub delim: String,

    /// CSV quote character
    #[arg(long, default_value = "\"")]
    pub quote: String,

    /// CSV escape character
    #[arg(long, default_value = "\"")]
    pub escape: String,

    /// CSV null marker
    #[arg(long, default_value = "")]
    pub nullstr: String,

    /// CSV files start with a header line
    #[arg(long)]
    pub header: bool,

    /// Print client counters to stderr when done
    #[arg(long)]
    pub stats: bool,

    /// Minimum log severity: trace, info, warn, error, fatal
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
