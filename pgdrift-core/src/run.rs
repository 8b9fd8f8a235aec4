//! Run orchestration: extract every instance, fingerprint, compare, report.
//!
//! A failing instance never aborts the run. Its error is logged with the
//! masked descriptor and recorded as an [`ExtractionFailure`]; the remaining
//! instances are still extracted and compared.

use crate::Result;
use crate::config::{ConnectionDescriptor, RunConfig};
use crate::drift::DriftMatrix;
use crate::error::DriftError;
use crate::extractor::{CatalogConnector, MetadataExtractor};
use crate::fingerprint::fingerprint_artifact;
use crate::report::{ReportArtifacts, ReportWriter};
use crate::result::{ExtractionFailure, MetadataResult};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    /// Successful extractions, in input order
    pub results: Vec<MetadataResult>,
    /// Failed extractions, in input order
    pub failures: Vec<ExtractionFailure>,
    /// Drift matrix over `results`; `None` when nothing succeeded
    pub matrix: Option<DriftMatrix>,
    /// Report files; `None` when no report was written
    pub report: Option<ReportArtifacts>,
    /// Why the report could not be written, if it failed
    pub report_error: Option<DriftError>,
}

impl RunSummary {
    /// Number of successful extractions
    pub fn successes(&self) -> usize {
        self.results.len()
    }

    /// Number of failed extractions
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Whether every instance was extracted and reported.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.report_error.is_none()
    }

    /// Whether every extracted instance has the same schema.
    pub fn is_uniform(&self) -> bool {
        self.matrix.as_ref().is_none_or(DriftMatrix::is_uniform)
    }
}

/// Runs a full drift check over `descriptors`.
///
/// Instances are extracted sequentially in input order unless
/// `config.max_concurrency > 1`. Either way results are ordered by input
/// position, so labels and report rows never depend on completion order.
/// Reports go to `config.target_folder`, tables to `console`.
///
/// # Errors
/// Only an invalid `config` is an error. Per-instance and reporting failures
/// are recorded in the returned [`RunSummary`].
pub async fn run_drift_check<C, W>(
    connector: C,
    descriptors: &[ConnectionDescriptor],
    config: RunConfig,
    console: &mut W,
) -> Result<RunSummary>
where
    C: CatalogConnector,
    W: Write,
{
    config.validate()?;
    let extractor = MetadataExtractor::new(connector, config);

    tracing::info!(
        "Starting drift check of {} instance(s), max concurrency {}",
        descriptors.len(),
        extractor.config().max_concurrency
    );

    let outcomes = if extractor.config().max_concurrency <= 1 {
        collect_sequential(&extractor, descriptors).await
    } else {
        collect_concurrent(&extractor, descriptors).await
    };

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (position, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                let descriptor = &descriptors[position];
                tracing::error!("Failed to export metadata for {}: {}", descriptor, e);
                failures.push(ExtractionFailure {
                    target: descriptor.to_string(),
                    position,
                    kind: e.kind(),
                    error_message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Completed metadata export: {} successes, {} failures",
        results.len(),
        failures.len()
    );

    let matrix = DriftMatrix::build(&results);
    let (report, report_error) = match &matrix {
        None => {
            tracing::warn!("No successful extractions; skipping checksum reports");
            (None, None)
        }
        Some(matrix) => {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
            let writer = ReportWriter::new(&extractor.config().target_folder, timestamp);
            match writer.write(&results, matrix, console) {
                Ok(artifacts) => (Some(artifacts), None),
                Err(e) => {
                    tracing::error!("Failed to write drift reports: {}", e);
                    (None, Some(e))
                }
            }
        }
    };

    Ok(RunSummary {
        results,
        failures,
        matrix,
        report,
        report_error,
    })
}

async fn collect_sequential<C: CatalogConnector>(
    extractor: &MetadataExtractor<C>,
    descriptors: &[ConnectionDescriptor],
) -> Vec<(usize, Result<MetadataResult>)> {
    let mut outcomes = Vec::with_capacity(descriptors.len());
    for (position, descriptor) in descriptors.iter().enumerate() {
        outcomes.push((position, export_one(extractor, descriptor, position).await));
    }
    outcomes
}

/// Uses `futures::stream::buffer_unordered` for bounded parallelism.
async fn collect_concurrent<C: CatalogConnector>(
    extractor: &MetadataExtractor<C>,
    descriptors: &[ConnectionDescriptor],
) -> Vec<(usize, Result<MetadataResult>)> {
    let exports = descriptors
        .iter()
        .enumerate()
        .map(|(position, descriptor)| async move {
            (position, export_one(extractor, descriptor, position).await)
        });

    let mut outcomes: Vec<_> = stream::iter(exports)
        .buffer_unordered(extractor.config().max_concurrency)
        .collect()
        .await;
    outcomes.sort_by_key(|(position, _)| *position);
    outcomes
}

async fn export_one<C: CatalogConnector>(
    extractor: &MetadataExtractor<C>,
    descriptor: &ConnectionDescriptor,
    position: usize,
) -> Result<MetadataResult> {
    let prefix = format!("db_{}", position.saturating_add(1));
    let extracted = extractor.extract(descriptor, &prefix).await?;
    let fingerprint = match fingerprint_artifact(&extracted.artifact_path).await {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            discard_artifact(&extracted.artifact_path).await;
            return Err(e);
        }
    };
    tracing::debug!("Fingerprint of {}: {}", descriptor, fingerprint);

    Ok(MetadataResult::new(
        extracted.artifact_path,
        fingerprint,
        descriptor.clone(),
        position,
    ))
}

/// Removes the artifact of an instance that is counted as failed.
async fn discard_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove artifact {}: {}", path.display(), e),
    }
}
