//! Pairwise drift matrix over instance fingerprints.
//!
//! Row and column order always equal input order. Inputs are neither sorted
//! nor de-duplicated; two instances with the same database name are told apart
//! by their position suffix.

use crate::fingerprint::Fingerprint;
use crate::result::MetadataResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Outcome of comparing two fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    /// Fingerprints are identical
    Match,
    /// Fingerprints differ: the schemas have drifted
    Mismatch,
}

impl MatchState {
    /// Whether this is [`MatchState::Match`]
    pub fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

impl From<bool> for MatchState {
    fn from(equal: bool) -> Self {
        if equal { Self::Match } else { Self::Mismatch }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => write!(f, "MATCH"),
            Self::Mismatch => write!(f, "MISMATCH"),
        }
    }
}

/// Per-instance view of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    /// Instance label
    pub label: String,
    /// Instance fingerprint
    pub fingerprint: Fingerprint,
    /// Number of *other* instances with the same fingerprint
    pub matching_peers: usize,
    /// Fingerprint group, numbered by first appearance starting at 0
    pub group: usize,
}

/// N×N match/mismatch matrix for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftMatrix {
    labels: Vec<String>,
    fingerprints: Vec<Fingerprint>,
    cells: Vec<Vec<MatchState>>,
}

impl DriftMatrix {
    /// Builds the matrix for `results`, in the given order.
    ///
    /// Returns `None` for an empty input; callers skip reporting in that case.
    ///
    /// # Example
    /// ```rust
    /// use pgdrift_core::drift::{DriftMatrix, MatchState};
    /// use pgdrift_core::fingerprint::fingerprint;
    ///
    /// let matrix = DriftMatrix::from_entries(vec![
    ///     ("orders-0".to_string(), fingerprint(b"a")),
    ///     ("orders-1".to_string(), fingerprint(b"a")),
    ///     ("orders-2".to_string(), fingerprint(b"b")),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(matrix.get(0, 1), Some(MatchState::Match));
    /// assert_eq!(matrix.get(0, 2), Some(MatchState::Mismatch));
    /// assert!(DriftMatrix::from_entries(Vec::new()).is_none());
    /// ```
    pub fn build(results: &[MetadataResult]) -> Option<Self> {
        Self::from_entries(
            results
                .iter()
                .map(|result| (result.label(), result.fingerprint.clone())),
        )
    }

    /// Builds the matrix from `(label, fingerprint)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Fingerprint)>) -> Option<Self> {
        let (labels, fingerprints): (Vec<String>, Vec<Fingerprint>) = entries.into_iter().unzip();
        if labels.is_empty() {
            return None;
        }

        let cells = fingerprints
            .iter()
            .map(|row| {
                fingerprints
                    .iter()
                    .map(|col| MatchState::from(row == col))
                    .collect()
            })
            .collect();

        Some(Self {
            labels,
            fingerprints,
            cells,
        })
    }

    /// Number of instances (N).
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false: an empty matrix is never built.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Instance labels in input order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fingerprints in input order.
    pub fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    /// Cell `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<MatchState> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Rows of the matrix, each N cells long.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[MatchState])> {
        self.labels
            .iter()
            .zip(&self.cells)
            .map(|(label, row)| (label.as_str(), row.as_slice()))
    }

    /// Whether every instance has the same schema.
    pub fn is_uniform(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_match())
    }

    /// Number of distinct fingerprints.
    pub fn distinct_fingerprints(&self) -> usize {
        self.group_ids().iter().copied().max().map_or(0, |max| max.saturating_add(1))
    }

    /// Per-instance summaries in input order.
    pub fn summaries(&self) -> Vec<InstanceSummary> {
        let groups = self.group_ids();
        self.cells
            .iter()
            .enumerate()
            .map(|(i, row)| InstanceSummary {
                label: self.labels[i].clone(),
                fingerprint: self.fingerprints[i].clone(),
                matching_peers: row
                    .iter()
                    .enumerate()
                    .filter(|(j, cell)| *j != i && cell.is_match())
                    .count(),
                group: groups[i],
            })
            .collect()
    }

    fn group_ids(&self) -> Vec<usize> {
        let mut seen: HashMap<&Fingerprint, usize> = HashMap::new();
        self.fingerprints
            .iter()
            .map(|fp| {
                let next = seen.len();
                *seen.entry(fp).or_insert(next)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ConnectionDescriptor;
    use crate::fingerprint::fingerprint;
    use proptest::prelude::*;

    fn result(database: &str, position: usize, content: &[u8]) -> MetadataResult {
        MetadataResult::new(
            format!("{database}.json"),
            fingerprint(content),
            ConnectionDescriptor::new("localhost", 5432, "postgres", "pw", database),
            position,
        )
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(DriftMatrix::build(&[]).is_none());
    }

    #[test]
    fn test_two_matching_one_drifted() {
        let results = vec![
            result("app", 0, b"users(id,name)"),
            result("app", 1, b"users(id,name)"),
            result("app", 2, b"users(id,name,age)"),
        ];
        let matrix = DriftMatrix::build(&results).unwrap();

        assert_eq!(matrix.labels(), &["app-0", "app-1", "app-2"]);
        let grid: Vec<Vec<String>> = matrix
            .rows()
            .map(|(_, row)| row.iter().map(ToString::to_string).collect())
            .collect();
        assert_eq!(
            grid,
            vec![
                vec!["MATCH", "MATCH", "MISMATCH"],
                vec!["MATCH", "MATCH", "MISMATCH"],
                vec!["MISMATCH", "MISMATCH", "MATCH"],
            ]
        );
        assert!(!matrix.is_uniform());
        assert_eq!(matrix.distinct_fingerprints(), 2);
    }

    #[test]
    fn test_labels_keep_original_positions() {
        let results = vec![result("app", 0, b"x"), result("app", 2, b"x")];
        let matrix = DriftMatrix::build(&results).unwrap();
        assert_eq!(matrix.labels(), &["app-0", "app-2"]);
        assert!(matrix.is_uniform());
    }

    #[test]
    fn test_no_dedup_of_same_named_databases() {
        let results = vec![result("orders", 0, b"x"), result("orders", 1, b"x")];
        let matrix = DriftMatrix::build(&results).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_ne!(matrix.labels()[0], matrix.labels()[1]);
    }

    #[test]
    fn test_summaries() {
        let results = vec![
            result("a", 0, b"one"),
            result("b", 1, b"two"),
            result("c", 2, b"one"),
        ];
        let summaries = DriftMatrix::build(&results).unwrap().summaries();

        assert_eq!(summaries[0].matching_peers, 1);
        assert_eq!(summaries[1].matching_peers, 0);
        assert_eq!(summaries[2].matching_peers, 1);
        assert_eq!(
            summaries.iter().map(|s| s.group).collect::<Vec<_>>(),
            vec![0, 1, 0]
        );
    }

    #[test]
    fn test_get_out_of_range() {
        let matrix = DriftMatrix::build(&[result("a", 0, b"x")]).unwrap();
        assert_eq!(matrix.get(0, 0), Some(MatchState::Match));
        assert_eq!(matrix.get(0, 1), None);
        assert_eq!(matrix.get(1, 0), None);
    }

    #[test]
    fn test_match_state_serialization() {
        assert_eq!(
            serde_json::to_string(&MatchState::Mismatch).unwrap(),
            "\"MISMATCH\""
        );
    }

    proptest! {
        #[test]
        fn prop_diagonal_and_symmetry(contents in prop::collection::vec(0u8..4, 1..12)) {
            let entries: Vec<(String, Fingerprint)> = contents
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("db-{i}"), fingerprint(&[*c])))
                .collect();
            let matrix = DriftMatrix::from_entries(entries).unwrap();
            let n = contents.len();

            prop_assert_eq!(matrix.len(), n);
            for i in 0..n {
                prop_assert_eq!(matrix.get(i, i), Some(MatchState::Match));
                for j in 0..n {
                    prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
                    prop_assert_eq!(
                        matrix.get(i, j).map(MatchState::is_match),
                        Some(contents[i] == contents[j])
                    );
                }
            }
        }
    }
}
