//! Checksum and drift matrix reports.
//!
//! Two CSV files per run, `{timestamp}-checksums.csv` and
//! `{timestamp}-checksum_match_matrix.csv`, plus the same two tables rendered
//! as aligned text for the console. Existing reports are never overwritten:
//! a run that finds either name taken writes `{timestamp}-N-...` instead.

use crate::Result;
use crate::drift::DriftMatrix;
use crate::error::DriftError;
use crate::result::MetadataResult;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header of the checksum table.
pub const CHECKSUM_HEADERS: [&str; 2] = ["Database", "Checksum"];

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    /// `{timestamp}-checksums.csv`
    pub checksums_path: PathBuf,
    /// `{timestamp}-checksum_match_matrix.csv`
    pub matrix_path: PathBuf,
}

/// A header row plus data rows, all as display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Header cells
    pub headers: Vec<String>,
    /// Data rows, each as long as `headers`
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Two-column (label, fingerprint) table in input order.
    pub fn checksums(results: &[MetadataResult]) -> Self {
        Self {
            headers: CHECKSUM_HEADERS.iter().map(ToString::to_string).collect(),
            rows: results
                .iter()
                .map(|result| vec![result.label(), result.fingerprint.to_string()])
                .collect(),
        }
    }

    /// Label-prefixed match/mismatch grid.
    pub fn match_matrix(matrix: &DriftMatrix) -> Self {
        let headers = std::iter::once(String::new())
            .chain(matrix.labels().iter().cloned())
            .collect();
        let rows = matrix
            .rows()
            .map(|(label, cells)| {
                std::iter::once(label.to_string())
                    .chain(cells.iter().map(ToString::to_string))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    /// Renders the table with padded columns, `" | "` between cells and a
    /// `-+-` rule under the header.
    pub fn render_aligned(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(idx) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }

        let format_row = |row: &[String]| -> String {
            row.iter()
                .enumerate()
                .map(|(idx, cell)| format!("{:<width$}", cell, width = widths[idx]))
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let separator = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut lines = Vec::with_capacity(self.rows.len().saturating_add(2));
        lines.push(format_row(self.headers.as_slice()));
        lines.push(separator);
        lines.extend(self.rows.iter().map(|row| format_row(row.as_slice())));
        lines.join("\n")
    }

    /// Writes the table as CSV into `file`, a freshly created report at `path`.
    ///
    /// # Errors
    /// Returns a reporting error if the file cannot be written.
    pub fn write_csv(&self, file: File, path: &Path) -> Result<()> {
        let wrap = |e: csv::Error| {
            DriftError::reporting(format!("Failed to write {}", path.display()), e)
        };

        let mut writer = csv::WriterBuilder::new()
            .flexible(false)
            .from_writer(file);
        writer.write_record(&self.headers).map_err(wrap)?;
        for row in &self.rows {
            writer.write_record(row).map_err(wrap)?;
        }
        writer.flush().map_err(|e| {
            DriftError::reporting(format!("Failed to flush {}", path.display()), e)
        })?;

        tracing::info!("Wrote table to {}", path.display());
        Ok(())
    }
}

/// Writes the per-run checksum and matrix reports.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    timestamp: String,
}

impl ReportWriter {
    /// Creates a writer for `output_dir`; `timestamp` prefixes every file name.
    pub fn new(output_dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Paths the reports are written to when no earlier run used them.
    pub fn artifact_paths(&self) -> ReportArtifacts {
        self.paths_with_suffix(0)
    }

    fn paths_with_suffix(&self, suffix: u32) -> ReportArtifacts {
        let stem = if suffix == 0 {
            self.timestamp.clone()
        } else {
            format!("{}-{}", self.timestamp, suffix)
        };
        ReportArtifacts {
            checksums_path: self.output_dir.join(format!("{}-checksums.csv", stem)),
            matrix_path: self
                .output_dir
                .join(format!("{}-checksum_match_matrix.csv", stem)),
        }
    }

    /// Creates both report files under the first free pair of names.
    fn create_unique(&self) -> Result<(ReportArtifacts, File, File)> {
        let mut suffix: u32 = 0;
        loop {
            let paths = self.paths_with_suffix(suffix);
            let checksums = match create_new(&paths.checksums_path)? {
                Some(file) => file,
                None => {
                    suffix = next_suffix(suffix, &paths.checksums_path)?;
                    continue;
                }
            };
            match create_new(&paths.matrix_path)? {
                Some(matrix) => return Ok((paths, checksums, matrix)),
                None => {
                    drop(checksums);
                    if let Err(e) = std::fs::remove_file(&paths.checksums_path) {
                        tracing::warn!(
                            "Failed to remove {}: {}",
                            paths.checksums_path.display(),
                            e
                        );
                    }
                    suffix = next_suffix(suffix, &paths.matrix_path)?;
                }
            }
        }
    }

    /// Writes both CSV reports and prints both tables to `console`.
    ///
    /// `results` must be the results `matrix` was built from, in the same
    /// order. Neither argument is modified.
    ///
    /// # Errors
    /// Returns a reporting error if the inputs disagree or any output fails.
    /// Snapshot artifacts written earlier are unaffected.
    pub fn write<W: Write>(
        &self,
        results: &[MetadataResult],
        matrix: &DriftMatrix,
        console: &mut W,
    ) -> Result<ReportArtifacts> {
        let labels: Vec<String> = results.iter().map(MetadataResult::label).collect();
        if labels.as_slice() != matrix.labels() {
            return Err(DriftError::reporting(
                "Results do not match drift matrix",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!(
                        "{} results for a {}x{} matrix",
                        results.len(),
                        matrix.len(),
                        matrix.len()
                    ),
                ),
            ));
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            DriftError::reporting(
                format!("Failed to create report folder {}", self.output_dir.display()),
                e,
            )
        })?;
        tracing::info!("Preparing tabulation tables in {}", self.output_dir.display());

        let checksums = Table::checksums(results);
        let grid = Table::match_matrix(matrix);
        let (artifacts, checksums_file, matrix_file) = self.create_unique()?;

        checksums.write_csv(checksums_file, &artifacts.checksums_path)?;
        grid.write_csv(matrix_file, &artifacts.matrix_path)?;

        let console_err =
            |e: std::io::Error| DriftError::reporting("Failed to write console report", e);
        writeln!(console, "\nChecksum:").map_err(console_err)?;
        writeln!(console, "{}", checksums.render_aligned()).map_err(console_err)?;
        writeln!(console, "\nMatch/Mismatch Matrix:").map_err(console_err)?;
        writeln!(console, "{}", grid.render_aligned()).map_err(console_err)?;
        console.flush().map_err(console_err)?;

        tracing::info!("Checksum and match tables printed to console and saved to CSV");
        Ok(artifacts)
    }
}

/// Opens `path` only if it does not exist yet; `None` when it does.
fn create_new(path: &Path) -> Result<Option<File>> {
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(DriftError::reporting(
            format!("Failed to create {}", path.display()),
            e,
        )),
    }
}

fn next_suffix(suffix: u32, taken: &Path) -> Result<u32> {
    if suffix >= 100 {
        return Err(DriftError::reporting(
            format!("No free report name next to {}", taken.display()),
            std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        ));
    }
    Ok(suffix.saturating_add(1))
}
