//! Per-instance extraction results and failures.

use crate::config::ConnectionDescriptor;
use crate::fingerprint::Fingerprint;
use std::path::PathBuf;

/// A successful extraction, ready for drift comparison.
#[derive(Debug, Clone)]
pub struct MetadataResult {
    /// Location of the snapshot artifact
    pub artifact_path: PathBuf,
    /// Fingerprint of the artifact's bytes
    pub fingerprint: Fingerprint,
    /// Descriptor the snapshot was extracted from
    pub descriptor: ConnectionDescriptor,
    /// Zero-based position of the descriptor in the run's input
    pub position: usize,
    /// Display name overriding the descriptor's database name
    pub database_label: Option<String>,
}

impl MetadataResult {
    /// Creates a result for the descriptor at `position`.
    pub fn new(
        artifact_path: impl Into<PathBuf>,
        fingerprint: Fingerprint,
        descriptor: ConnectionDescriptor,
        position: usize,
    ) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            fingerprint,
            descriptor,
            position,
            database_label: None,
        }
    }

    /// Overrides the database name used in labels.
    pub fn with_database_label(mut self, label: impl Into<String>) -> Self {
        self.database_label = Some(label.into());
        self
    }

    /// Report label: `{database}-{position}`.
    ///
    /// The position is the input position, not the index among successful
    /// results, so labels stay stable when other instances fail.
    pub fn label(&self) -> String {
        let database = self
            .database_label
            .as_deref()
            .unwrap_or_else(|| self.descriptor.database());
        format!("{}-{}", database, self.position)
    }
}

/// A failed extraction.
#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    /// Masked descriptor (`user@host:port/database`)
    pub target: String,
    /// Zero-based position of the descriptor in the run's input
    pub position: usize,
    /// Error category, see [`crate::error::DriftError::kind`]
    pub kind: &'static str,
    /// Sanitized error message
    pub error_message: String,
}

impl ExtractionFailure {
    /// 1-based instance number, the `<n>` of its `PG_DRIFT_DB_*_<n>` variables.
    pub fn instance_number(&self) -> usize {
        self.position.saturating_add(1)
    }
}
