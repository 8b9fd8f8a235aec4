//! Content fingerprints over canonical snapshot bytes.
//!
//! Fingerprints are SHA-256 digests of the exact bytes written to a snapshot
//! artifact, so any artifact can be re-verified from disk alone.

use crate::Result;
use crate::error::DriftError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Lowercase hex SHA-256 digest of a snapshot artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` hex characters, for compact console output.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of `bytes`.
///
/// # Example
/// ```rust
/// use pgdrift_core::fingerprint::fingerprint;
///
/// let digest = fingerprint(b"{}");
/// assert_eq!(digest.as_str().len(), 64);
/// assert_eq!(digest, fingerprint(b"{}"));
/// ```
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Reads an artifact back from disk and computes its fingerprint.
///
/// # Errors
/// Returns an I/O error if the artifact cannot be read.
pub async fn fingerprint_artifact(path: &Path) -> Result<Fingerprint> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        DriftError::io(
            format!("Failed to read snapshot artifact {}", path.display()),
            e,
        )
    })?;
    Ok(fingerprint(&bytes))
}
