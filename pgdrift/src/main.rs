//! PostgreSQL schema drift checker.
//!
//! Snapshots the catalog of every configured instance, fingerprints each
//! snapshot, and prints which instances share a schema.
//!
//! # Security Guarantees
//! - Read-only catalog queries only
//! - Passwords are read from the environment and never logged or reported

use anyhow::Context;
use clap::{Args, Parser};
use pgdrift_core::{
    EnvConfig, ExtractionFailure, PostgresConnector, RunSummary,
    logging::{DEFAULT_LOG_DIR, init_logging},
    run_drift_check,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Exit status when at least one instance could not be checked.
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "pgdrift")]
#[command(about = "Detects schema drift across PostgreSQL instances")]
#[command(version)]
#[command(long_about = "
pgdrift - Schema drift detection for PostgreSQL replicas

Extracts table and column metadata from every configured instance, writes one
canonical JSON snapshot per instance, and compares their SHA-256 checksums.

CONFIGURATION (environment):
  DB_COUNT                      Number of instances (default 1, at most 1000)
  PG_DRIFT_DB_HOST_<n>          Host of instance n (default localhost)
  PG_DRIFT_DB_PORT_<n>          Port of instance n (default 5432)
  PG_DRIFT_DB_USER_<n>          User of instance n (default postgres)
  PG_DRIFT_DB_PASSWORD_<n>      Password of instance n
  PG_DRIFT_DB_NAME_<n>          Database of instance n (default postgres)

OUTPUT:
  <target>/db_<n>-<database>-<timestamp>.json
  <target>/<timestamp>-checksums.csv
  <target>/<timestamp>-checksum_match_matrix.csv
  Names already taken get a -N suffix after the timestamp.

EXIT STATUS:
  0  every instance was checked
  1  configuration error
  2  at least one instance failed
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Folder for snapshots and reports
    #[arg(long, help = "Folder for snapshot artifacts and reports")]
    target_folder: Option<PathBuf>,

    /// Catalog schema to compare
    #[arg(long, help = "Catalog schema to snapshot (default public)")]
    schema: Option<String>,

    /// Concurrent extractions
    #[arg(long, help = "Maximum concurrent extractions (default 1)")]
    concurrency: Option<usize>,

    /// Connection retries
    #[arg(long, help = "Retries after a connection failure (default 0)")]
    connect_retries: Option<u32>,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    quiet: bool,

    /// Log file folder
    #[arg(long, default_value = DEFAULT_LOG_DIR, help = "Folder for per-run log files")]
    log_dir: PathBuf,

    /// Disable the log file
    #[arg(long, help = "Log to stderr only")]
    no_log_file: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_dir = (!cli.global.no_log_file).then_some(cli.global.log_dir.as_path());
    init_logging(cli.global.verbose, cli.global.quiet, log_dir)
        .context("Failed to initialize logging")?;

    let env = EnvConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    let EnvConfig {
        descriptors,
        mut run,
    } = env;

    if let Some(folder) = cli.target_folder {
        run.target_folder = folder;
    }
    if let Some(schema) = cli.schema {
        run = run.with_schema(schema);
    }
    if let Some(concurrency) = cli.concurrency {
        run = run.with_max_concurrency(concurrency);
    }
    if let Some(retries) = cli.connect_retries {
        let backoff = run.retry_backoff;
        run = run.with_connect_retries(retries, backoff);
    }

    info!(
        "Checking {} instance(s), schema '{}'",
        descriptors.len(),
        run.schema
    );
    for descriptor in &descriptors {
        info!("Target: {}", descriptor.redacted_url());
    }

    let connector = PostgresConnector::new();
    let summary = run_drift_check(connector, &descriptors, run, &mut std::io::stdout())
        .await
        .context("Drift check could not start")?;

    report_outcome(&summary);

    if summary.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    }
}

/// One log line per failed instance, numbered like its environment variables.
fn describe_failure(failure: &ExtractionFailure) -> String {
    format!(
        "Instance {} ({}) failed [{}]: {}",
        failure.instance_number(),
        failure.target,
        failure.kind,
        failure.error_message
    )
}

/// Logs the tallies and every failure.
fn report_outcome(summary: &RunSummary) {
    for failure in &summary.failures {
        warn!("{}", describe_failure(failure));
    }
    if let Some(e) = &summary.report_error {
        warn!("Reports were not written: {}", e);
    }

    match &summary.matrix {
        Some(matrix) if matrix.is_uniform() => {
            info!("✓ All {} extracted instances share one schema", matrix.len());
        }
        Some(matrix) => {
            warn!(
                "Schema drift detected: {} distinct schemas across {} instances",
                matrix.distinct_fingerprints(),
                matrix.len()
            );
            for instance in matrix.summaries() {
                info!(
                    "{}: checksum {} (group {}, matches {} other instance(s))",
                    instance.label,
                    instance.fingerprint.short(12),
                    instance.group,
                    instance.matching_peers
                );
            }
        }
        None => warn!("No instance could be extracted"),
    }

    if let Some(report) = &summary.report {
        info!("Checksums: {}", report.checksums_path.display());
        info!("Match matrix: {}", report.matrix_path.display());
    }

    info!(
        "Completed: {} successes, {} failures",
        summary.successes(),
        summary.failure_count()
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides_parse() {
        let cli = Cli::try_parse_from([
            "pgdrift",
            "-vv",
            "--target-folder",
            "/tmp/out",
            "--concurrency",
            "4",
            "--connect-retries",
            "3",
            "--no-log-file",
        ])
        .unwrap();

        assert_eq!(cli.global.verbose, 2);
        assert!(cli.global.no_log_file);
        assert_eq!(cli.target_folder, Some(PathBuf::from("/tmp/out")));
        assert_eq!(cli.concurrency, Some(4));
        assert_eq!(cli.connect_retries, Some(3));
        assert_eq!(cli.global.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
    }

    #[test]
    fn test_failure_line_numbers_instances_from_one() {
        let failure = ExtractionFailure {
            target: "postgres@replica:5432/app".to_string(),
            position: 0,
            kind: "connection",
            error_message: "refused".to_string(),
        };
        assert_eq!(
            describe_failure(&failure),
            "Instance 1 (postgres@replica:5432/app) failed [connection]: refused"
        );
    }
}
