//! Logging setup for the pgdrift binary.
//!
//! Console output goes to stderr so stdout only carries the report tables.
//! Optionally every event is also appended to a per-run log file.

use crate::Result;
use crate::error::DriftError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default folder for per-run log files.
pub const DEFAULT_LOG_DIR: &str = "pgdrift-logs";

/// Maps CLI verbosity to a level: 0=INFO, 1=DEBUG, 2+=TRACE, quiet=ERROR.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes the global subscriber.
///
/// When `log_dir` is set, events are also written to
/// `{log_dir}/pgdrift-{timestamp}.log`, whose path is returned.
///
/// # Errors
/// Returns a configuration error if the log file cannot be created or a
/// global subscriber is already installed.
///
/// # Example
/// ```rust,no_run
/// use pgdrift_core::logging::init_logging;
///
/// let log_file = init_logging(1, false, None).expect("Failed to initialize logging");
/// assert!(log_file.is_none());
/// ```
pub fn init_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = LevelFilter::from_level(level_for(verbose, quiet));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (log_path, file_layer) = match log_dir {
        Some(dir) => {
            let (path, file) = open_log_file(dir)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(path), Some(layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| DriftError::configuration(format!("Failed to initialize logging: {}", e)))?;

    if let Some(path) = &log_path {
        tracing::debug!("Logging to {}", path.display());
    }

    Ok(log_path)
}

/// Creates `dir` if needed and opens a fresh timestamped log file in it.
fn open_log_file(dir: &Path) -> Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir).map_err(|e| {
        DriftError::configuration(format!(
            "Failed to create log directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("pgdrift-{}.log", timestamp));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            DriftError::configuration(format!(
                "Failed to open log file {}: {}",
                path.display(),
                e
            ))
        })?;

    Ok((path, file))
}
