//! Core engine of pgdrift.
//!
//! Extracts the catalog metadata of several PostgreSQL instances into a
//! canonical snapshot per instance, fingerprints each snapshot, and reports
//! which instances share a schema and which have drifted.
//!
//! # Security Guarantees
//! - Catalog sessions are read-only
//! - Passwords are zeroized on drop and never appear in logs, errors or reports
//! - Snapshot artifacts contain schema metadata only
//!
//! # Architecture
//! - `extractor`: connector trait plus the PostgreSQL implementation
//! - `snapshot` / `fingerprint`: canonical form and SHA-256 digest
//! - `drift` / `report`: pairwise matrix and CSV/console output
//! - `run`: per-instance fault isolation and aggregation

pub mod config;
pub mod drift;
pub mod error;
pub mod extractor;
pub mod fingerprint;
pub mod logging;
pub mod report;
pub mod result;
pub mod run;
pub mod snapshot;

// Re-export commonly used types
pub use config::{ConnectionDescriptor, EnvConfig, RunConfig};
pub use drift::{DriftMatrix, InstanceSummary, MatchState};
pub use error::{DriftError, Result};
pub use extractor::{CatalogConnector, CatalogSession, ExtractedSnapshot, MetadataExtractor};
pub use fingerprint::{Fingerprint, fingerprint};
pub use report::{ReportArtifacts, ReportWriter};
pub use result::{ExtractionFailure, MetadataResult};
pub use run::{RunSummary, run_drift_check};
pub use snapshot::{CatalogRow, ColumnDescriptor, Nullability, SchemaSnapshot};

#[cfg(feature = "postgresql")]
pub use extractor::PostgresConnector;
