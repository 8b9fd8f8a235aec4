//! Metadata extraction: catalog query, canonical snapshot, artifact file.
//!
//! # Module Structure
//! - `postgres`: `information_schema` backed connector (feature `postgresql`)
//!
//! The extractor itself is engine agnostic. It drives a [`CatalogConnector`]
//! through connect, query and close, folds the rows into a
//! [`SchemaSnapshot`], and persists the canonical bytes.
//!
//! # Resource Guarantees
//! - Every session that was opened is closed again, on success and on failure
//! - Exactly one artifact file per successful extraction, none on failure
//! - Connect and query steps are bounded by the configured timeouts

#[cfg(feature = "postgresql")]
pub mod postgres;

use crate::config::{ConnectionDescriptor, RunConfig};
use crate::error::DriftError;
use crate::snapshot::{CatalogRow, SchemaSnapshot};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[cfg(feature = "postgresql")]
pub use postgres::PostgresConnector;

/// File extension of snapshot artifacts.
pub const ARTIFACT_EXTENSION: &str = "json";

/// An open connection to one instance, able to run the catalog query.
#[async_trait]
pub trait CatalogSession: Send {
    /// Returns one row per column of every table in `schema`.
    ///
    /// Implementations should order rows by table name, then ordinal
    /// position; the snapshot re-imposes that order regardless.
    async fn fetch_catalog(&mut self, schema: &str) -> Result<Vec<CatalogRow>>;

    /// Releases the connection. Called exactly once per opened session.
    async fn close(&mut self) -> Result<()>;
}

/// Opens catalog sessions for connection descriptors.
#[async_trait]
pub trait CatalogConnector: Send + Sync {
    /// Engine name used in log lines
    fn name(&self) -> &'static str;

    /// Opens a session to the instance described by `descriptor`.
    ///
    /// # Errors
    /// Network and authentication failures must be reported as
    /// [`DriftError::Connection`] so the run can retry them.
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        config: &RunConfig,
    ) -> Result<Box<dyn CatalogSession>>;
}

/// Outcome of one successful extraction.
#[derive(Debug, Clone)]
pub struct ExtractedSnapshot {
    /// The canonical in-memory snapshot
    pub snapshot: SchemaSnapshot,
    /// Exact bytes written to the artifact
    pub canonical_bytes: Vec<u8>,
    /// Location of the artifact file
    pub artifact_path: PathBuf,
}

/// Extracts schema snapshots through a [`CatalogConnector`].
pub struct MetadataExtractor<C> {
    connector: C,
    config: RunConfig,
}

impl<C: CatalogConnector> MetadataExtractor<C> {
    /// Creates an extractor writing artifacts under `config.target_folder`.
    pub fn new(connector: C, config: RunConfig) -> Self {
        Self { connector, config }
    }

    /// Run configuration in use
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Extracts the snapshot of one instance and writes its artifact.
    ///
    /// The artifact is named `{prefix}-{database}-{timestamp}.json`.
    ///
    /// # Errors
    /// - [`DriftError::Connection`] / [`DriftError::ConnectionTimeout`] when the
    ///   instance cannot be reached after all retries
    /// - [`DriftError::Query`] when the catalog query fails or times out
    /// - [`DriftError::Io`] when the artifact cannot be written
    pub async fn extract(
        &self,
        descriptor: &ConnectionDescriptor,
        prefix: &str,
    ) -> Result<ExtractedSnapshot> {
        tracing::info!("Starting metadata export for database: {}", descriptor);

        let mut session = self.connect_with_retry(descriptor).await?;
        tracing::debug!("{} session established for {}", self.connector.name(), descriptor);

        let fetched = match tokio::time::timeout(
            self.config.query_timeout,
            session.fetch_catalog(&self.config.schema),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DriftError::query(format!(
                "Catalog query on {} timed out after {:?}",
                descriptor, self.config.query_timeout
            ))),
        };

        // Close before inspecting the query outcome so every path releases it
        if let Err(e) = session.close().await {
            tracing::warn!("Error closing connection to {}: {}", descriptor, e);
        } else {
            tracing::debug!("Database connection closed for {}", descriptor);
        }

        let rows = fetched?;
        tracing::debug!("Executed metadata query; fetched {} rows", rows.len());

        let snapshot = SchemaSnapshot::from_rows(rows);
        tracing::debug!(
            "Formatted metadata for {} tables ({} columns)",
            snapshot.table_count(),
            snapshot.column_count()
        );
        if snapshot.is_empty() {
            tracing::warn!(
                "Schema '{}' on {} has no tables",
                self.config.schema,
                descriptor
            );
        }

        let canonical_bytes = snapshot.to_canonical_bytes()?;
        let artifact_path = self
            .write_artifact(descriptor.database(), prefix, &canonical_bytes)
            .await?;

        tracing::info!("Successfully wrote metadata to {}", artifact_path.display());

        Ok(ExtractedSnapshot {
            snapshot,
            canonical_bytes,
            artifact_path,
        })
    }

    async fn connect_with_retry(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn CatalogSession>> {
        let mut attempt: u32 = 0;
        loop {
            match self.connect_once(descriptor).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_connection_error() && attempt < self.config.connect_retries => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.config.backoff_for(attempt);
                    tracing::warn!(
                        "Connection to {} failed ({}); retry {}/{} in {:?}",
                        descriptor,
                        e,
                        attempt,
                        self.config.connect_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect_once(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn CatalogSession>> {
        tokio::time::timeout(
            self.config.connect_timeout,
            self.connector.connect(descriptor, &self.config),
        )
        .await
        .map_err(|_| {
            DriftError::connection_timeout(descriptor.to_string(), self.config.connect_timeout)
        })?
    }

    async fn write_artifact(&self, database: &str, prefix: &str, bytes: &[u8]) -> Result<PathBuf> {
        let folder = &self.config.target_folder;
        tokio::fs::create_dir_all(folder).await.map_err(|e| {
            DriftError::io(
                format!("Failed to create target folder {}", folder.display()),
                e,
            )
        })?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let stem = format!("{}-{}-{}", prefix, sanitize_file_component(database), timestamp);

        let (path, mut file) = create_unique(folder, &stem).await?;
        tracing::debug!("Generated export filepath: {}", path.display());

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(
                    "Failed to remove partial artifact {}: {}",
                    path.display(),
                    remove_err
                );
            }
            return Err(DriftError::io(
                format!("Failed to write snapshot artifact {}", path.display()),
                e,
            ));
        }

        Ok(path)
    }
}

/// Creates `{stem}.json`, or `{stem}-N.json` if that name is taken.
async fn create_unique(folder: &Path, stem: &str) -> Result<(PathBuf, tokio::fs::File)> {
    let mut suffix: u32 = 0;
    loop {
        let file_name = if suffix == 0 {
            format!("{}.{}", stem, ARTIFACT_EXTENSION)
        } else {
            format!("{}-{}.{}", stem, suffix, ARTIFACT_EXTENSION)
        };
        let path = folder.join(file_name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && suffix < 100 => {
                suffix = suffix.saturating_add(1);
            }
            Err(e) => {
                return Err(DriftError::io(
                    format!("Failed to create snapshot artifact {}", path.display()),
                    e,
                ));
            }
        }
    }
}

/// Replaces characters that are unsafe in file names.
fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '$') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
