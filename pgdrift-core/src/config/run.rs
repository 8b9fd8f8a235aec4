//! Run-wide settings shared by every extraction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Folder snapshots and reports land in when nothing else is configured.
pub const DEFAULT_TARGET_FOLDER: &str = "metadata_exports";

/// Catalog schema that is snapshotted by default.
pub const DEFAULT_SCHEMA: &str = "public";

/// Configuration for one drift-check run.
///
/// Controls where artifacts are written, which catalog schema is inspected,
/// and how extractions are scheduled.
///
/// # Example
/// ```rust
/// use pgdrift_core::config::RunConfig;
/// use std::time::Duration;
///
/// let config = RunConfig::new("exports")
///     .with_max_concurrency(4)
///     .with_connect_timeout(Duration::from_secs(10));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Folder receiving snapshot artifacts and reports
    pub target_folder: PathBuf,

    /// Catalog schema to snapshot on every instance
    pub schema: String,

    /// Maximum number of concurrent extractions.
    ///
    /// 1 keeps the strictly sequential behaviour.
    /// Default: 1
    pub max_concurrency: usize,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,

    /// Timeout for the catalog query
    pub query_timeout: Duration,

    /// Additional connection attempts after a connection failure.
    /// Default: 0
    pub connect_retries: u32,

    /// Delay before the first retry; doubled on every further attempt
    pub retry_backoff: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_folder: PathBuf::from(DEFAULT_TARGET_FOLDER),
            schema: DEFAULT_SCHEMA.to_string(),
            max_concurrency: 1,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            connect_retries: 0,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl RunConfig {
    /// Creates a configuration writing into `target_folder`, other values default.
    pub fn new(target_folder: impl Into<PathBuf>) -> Self {
        Self {
            target_folder: target_folder.into(),
            ..Default::default()
        }
    }

    /// Sets the catalog schema to snapshot.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Sets the maximum concurrency for extraction.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1); // Ensure at least 1
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the catalog query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets retry count and initial backoff for connection failures.
    pub fn with_connect_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.connect_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.retry_backoff.saturating_mul(factor)
    }

    /// Validates run configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.target_folder.as_os_str().is_empty() {
            return Err(crate::error::DriftError::configuration(
                "target folder cannot be empty",
            ));
        }

        if self.schema.trim().is_empty() {
            return Err(crate::error::DriftError::configuration(
                "schema cannot be empty",
            ));
        }

        if self.max_concurrency == 0 {
            return Err(crate::error::DriftError::configuration(
                "max_concurrency must be greater than 0",
            ));
        }

        if self.max_concurrency > 64 {
            return Err(crate::error::DriftError::configuration(
                "max_concurrency should not exceed 64",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::DriftError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() {
            return Err(crate::error::DriftError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        if self.connect_retries > 10 {
            return Err(crate::error::DriftError::configuration(
                "connect_retries should not exceed 10",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_default() {
        let config = RunConfig::default();
        assert_eq!(config.target_folder, PathBuf::from("metadata_exports"));
        assert_eq!(config.schema, "public");
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.connect_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_config_validation() {
        let config = RunConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            schema: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            connect_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            target_folder: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            connect_retries: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_max_concurrency_clamps_to_one() {
        let config = RunConfig::default().with_max_concurrency(0);
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let config =
            RunConfig::default().with_connect_retries(3, Duration::from_millis(100));
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
    }
}
