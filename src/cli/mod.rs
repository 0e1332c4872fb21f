//! CLI module for kite
//!
//! Provides command-line interface for:
//! - query: Run a query against fragment servers and print its rows
//! - dump: Decode a vector container file and print its rows

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Format, QueryArgs};
pub use commands::{dump, filespec, query, resolve_config, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_row, write_row_count};
