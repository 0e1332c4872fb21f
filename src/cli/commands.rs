//! CLI command implementations
//!
//! Both commands write rows to stdout and logs to stderr.

use std::io::{self, Write};
use std::path::Path;

use crate::client::{load_schema, ClientConfig, CsvSpec, FileSpec, KiteClient};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::xrg::{read_container_file, RowIterator};

use super::args::{Command, Format, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_row, write_row_count};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Query(args) => query(&args, &mut out),
        Command::Dump { file, log_level } => {
            apply_log_level(log_level.as_deref())?;
            dump(&file, &mut out)
        }
    }
}

fn apply_log_level(level: Option<&str>) -> CliResult<()> {
    if let Some(level) = level {
        let severity = Severity::parse(level)
            .ok_or_else(|| CliError::config_error(format!("invalid log level '{}'", level)))?;
        Logger::set_threshold(severity);
    }
    Ok(())
}

/// Merges the config file (if any) with command-line overrides.
pub fn resolve_config(args: &QueryArgs) -> CliResult<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let config = ClientConfig::load(path)?;
            log_event(
                Event::ConfigLoaded,
                &[("path", path.display().to_string().as_str())],
            );
            config
        }
        None => ClientConfig::default(),
    };

    if !args.hosts.is_empty() {
        config.hosts = args.hosts.clone();
    }
    if let Some(count) = args.fragments {
        config.fragment_count = count;
    }
    if args.fragment.is_some() {
        config.fragment_id = args.fragment;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

pub fn filespec(args: &QueryArgs) -> FileSpec {
    match args.format {
        Format::Parquet => FileSpec::Parquet,
        Format::Csv => FileSpec::Csv(CsvSpec {
            delim: args.delim.clone(),
            quote: args.quote.clone(),
            escape: args.escape.clone(),
            nullstr: args.nullstr.clone(),
            header_line: args.header,
        }),
    }
}

/// Submit a query and print every row
pub fn query<W: Write>(args: &QueryArgs, out: &mut W) -> CliResult<()> {
    let config = resolve_config(args)?;
    Logger::set_threshold(config.severity()?);

    let schema = load_schema(&args.schema)?;
    log_event(
        Event::SchemaLoaded,
        &[
            ("path", args.schema.display().to_string().as_str()),
            ("columns", schema.len().to_string().as_str()),
        ],
    );

    let mut client = KiteClient::from_config(&config)
        .sql(args.sql.clone())
        .schema(schema)
        .filespec(filespec(args));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io_error(format!("failed to create tokio runtime: {}", e)))?;

    let result = rt.block_on(drain(&mut client, &mut *out));
    client.close();
    if args.stats {
        eprintln!("{}", client.metrics_snapshot().to_json());
    }
    write_row_count(out, result?)
}

async fn drain<W: Write>(client: &mut KiteClient, out: &mut W) -> CliResult<u64> {
    client.submit().await?;
    let mut count = 0u64;
    while let Some(row) = client.next_row().await? {
        write_row(out, &row)?;
        count += 1;
    }
    Ok(count)
}

/// Decode a container file and print its rows
pub fn dump<W: Write>(path: &Path, out: &mut W) -> CliResult<()> {
    let vectors = read_container_file(path)?;
    let mut count = 0u64;
    if !vectors.is_empty() {
        let mut iter = RowIterator::new(vectors)?;
        while iter.advance()? {
            write_row(out, iter.current_row()?)?;
            count += 1;
        }
    }
    write_row_count(out, count)
}
