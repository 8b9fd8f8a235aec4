//! Error types with credential sanitization.
//!
//! Every per-instance failure is reported through [`DriftError`]. Messages
//! carry the masked descriptor at most; passwords and raw connection strings
//! never reach an error message, a log line, or a report artifact.

use std::time::Duration;
use thiserror::Error;

/// Main error type for pgdrift operations.
///
/// # Security
/// All error messages are sanitized to prevent credential leakage.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Invalid or missing run configuration. Fatal before any extraction.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network or authentication failure while connecting (credentials sanitized)
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Connection attempt exceeded the configured timeout
    #[error("Connection to {target} timed out after {timeout:?}")]
    ConnectionTimeout { target: String, timeout: Duration },

    /// Catalog query failed, e.g. insufficient privilege or statement timeout
    #[error("Catalog query failed: {context}")]
    Query {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Snapshot artifact could not be written or read back
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be serialized to its canonical form
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Checksum or matrix report could not be written
    #[error("Report generation failed: {context}")]
    Reporting {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for Results with `DriftError`
pub type Result<T> = std::result::Result<T, DriftError>;

impl DriftError {
    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(target: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: format!("Failed to connect to {}", target.into()),
            source: Box::new(error),
        }
    }

    /// Creates a connection timeout error
    pub fn connection_timeout(target: impl Into<String>, timeout: Duration) -> Self {
        Self::ConnectionTimeout {
            target: target.into(),
            timeout,
        }
    }

    /// Creates a query error wrapping the driver failure
    pub fn query_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a query error without an underlying driver error
    pub fn query(context: impl Into<String>) -> Self {
        Self::Query {
            context: context.into(),
            source: None,
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a reporting error
    pub fn reporting<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Reporting {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether the failure happened while establishing the connection.
    ///
    /// Only these failures are retried.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionTimeout { .. }
        )
    }

    /// Short category name used in failure records and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Connection { .. } | Self::ConnectionTimeout { .. } => "connection",
            Self::Query { .. } => "query",
            Self::Io { .. } => "io",
            Self::Serialization { .. } => "serialization",
            Self::Reporting { .. } => "reporting",
        }
    }
}
