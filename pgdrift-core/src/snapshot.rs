//! Canonical schema snapshot model.
//!
//! A [`SchemaSnapshot`] maps table names to their columns. Its ordering is
//! part of the type: tables are kept in ascending byte order of their names
//! and each table's columns in ascending ordinal position, whatever order the
//! catalog rows arrived in. Checksums are computed over the serialized
//! snapshot, so this ordering is what makes them comparable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column nullability as reported by `information_schema.columns.is_nullable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    /// Column accepts NULL
    #[serde(rename = "YES")]
    Nullable,
    /// Column is declared NOT NULL
    #[serde(rename = "NO")]
    NotNull,
}

impl Nullability {
    /// Parses the catalog's `YES`/`NO` representation.
    ///
    /// # Errors
    /// Returns a query error for any other value.
    pub fn from_catalog(value: &str) -> crate::Result<Self> {
        match value.trim() {
            "YES" => Ok(Self::Nullable),
            "NO" => Ok(Self::NotNull),
            other => Err(crate::error::DriftError::query(format!(
                "Unexpected is_nullable value '{}' in catalog",
                other
            ))),
        }
    }
}

impl From<bool> for Nullability {
    fn from(nullable: bool) -> Self {
        if nullable {
            Self::Nullable
        } else {
            Self::NotNull
        }
    }
}

impl std::fmt::Display for Nullability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nullable => write!(f, "YES"),
            Self::NotNull => write!(f, "NO"),
        }
    }
}

/// One column of a snapshotted table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub column_name: String,
    /// Catalog data type name, e.g. `integer` or `character varying`
    pub data_type: String,
    /// Whether the column accepts NULL
    pub is_nullable: Nullability,
}

impl ColumnDescriptor {
    /// Creates a column descriptor.
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: impl Into<Nullability>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: is_nullable.into(),
        }
    }
}

/// One row of the catalog query: a column together with its table and
/// declaration position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    /// Owning table
    pub table_name: String,
    /// 1-based declaration position within the table
    pub ordinal_position: i32,
    /// The column itself
    pub column: ColumnDescriptor,
}

impl CatalogRow {
    /// Creates a catalog row.
    pub fn new(
        table_name: impl Into<String>,
        ordinal_position: i32,
        column: ColumnDescriptor,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            ordinal_position,
            column,
        }
    }
}

/// Canonical snapshot of one instance's tables and columns.
///
/// # Example
/// ```rust
/// use pgdrift_core::snapshot::{CatalogRow, ColumnDescriptor, SchemaSnapshot};
///
/// let snapshot = SchemaSnapshot::from_rows(vec![
///     CatalogRow::new("users", 2, ColumnDescriptor::new("name", "text", true)),
///     CatalogRow::new("accounts", 1, ColumnDescriptor::new("id", "integer", false)),
///     CatalogRow::new("users", 1, ColumnDescriptor::new("id", "integer", false)),
/// ]);
///
/// let tables: Vec<_> = snapshot.table_names().collect();
/// assert_eq!(tables, vec!["accounts", "users"]);
/// assert_eq!(snapshot.columns("users").unwrap()[0].column_name, "id");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, Vec<ColumnDescriptor>>,
}

impl SchemaSnapshot {
    /// Folds catalog rows into a snapshot.
    ///
    /// Rows are ordered by table name, then ordinal position, before folding,
    /// so the result does not depend on the order rows were delivered in.
    pub fn from_rows(rows: impl IntoIterator<Item = CatalogRow>) -> Self {
        let mut rows: Vec<CatalogRow> = rows.into_iter().collect();
        rows.sort_by(|a, b| {
            a.table_name
                .cmp(&b.table_name)
                .then(a.ordinal_position.cmp(&b.ordinal_position))
        });

        let mut tables: BTreeMap<String, Vec<ColumnDescriptor>> = BTreeMap::new();
        for row in rows {
            tables.entry(row.table_name).or_default().push(row.column);
        }

        Self { tables }
    }

    /// Whether the schema contains no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of columns across all tables.
    pub fn column_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Table names in canonical order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Columns of `table` in declaration order.
    pub fn columns(&self, table: &str) -> Option<&[ColumnDescriptor]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Iterates tables and their columns in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ColumnDescriptor])> {
        self.tables
            .iter()
            .map(|(name, columns)| (name.as_str(), columns.as_slice()))
    }

    /// Serializes the snapshot to its canonical byte form.
    ///
    /// Pretty JSON with two-space indentation. Table keys follow the snapshot
    /// ordering and column fields follow declaration order of
    /// [`ColumnDescriptor`].
    ///
    /// # Errors
    /// Returns a serialization error if JSON encoding fails.
    pub fn to_canonical_bytes(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| crate::error::DriftError::Serialization {
            context: "Failed to serialize schema snapshot".to_string(),
            source: e,
        })
    }

    /// Parses a snapshot previously produced by [`SchemaSnapshot::to_canonical_bytes`].
    ///
    /// # Errors
    /// Returns a serialization error if the bytes are not a valid snapshot.
    pub fn from_canonical_bytes(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| crate::error::DriftError::Serialization {
            context: "Failed to parse schema snapshot".to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn users_rows() -> Vec<CatalogRow> {
        vec![
            CatalogRow::new("users", 1, ColumnDescriptor::new("id", "integer", false)),
            CatalogRow::new("users", 2, ColumnDescriptor::new("name", "text", true)),
        ]
    }

    #[test]
    fn test_fold_groups_columns_by_table() {
        let snapshot = SchemaSnapshot::from_rows(users_rows());
        assert_eq!(snapshot.table_count(), 1);
        assert_eq!(snapshot.column_count(), 2);

        let columns = snapshot.columns("users").unwrap();
        assert_eq!(columns[0].column_name, "id");
        assert_eq!(columns[1].column_name, "name");
        assert_eq!(columns[1].is_nullable, Nullability::Nullable);
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let mut shuffled = users_rows();
        shuffled.reverse();
        shuffled.insert(
            0,
            CatalogRow::new("accounts", 1, ColumnDescriptor::new("id", "bigint", false)),
        );

        let mut sorted = vec![CatalogRow::new(
            "accounts",
            1,
            ColumnDescriptor::new("id", "bigint", false),
        )];
        sorted.extend(users_rows());

        let a = SchemaSnapshot::from_rows(shuffled);
        let b = SchemaSnapshot::from_rows(sorted);
        assert_eq!(a, b);
        assert_eq!(
            a.to_canonical_bytes().unwrap(),
            b.to_canonical_bytes().unwrap()
        );
    }

    #[test]
    fn test_tables_sorted_by_name() {
        let snapshot = SchemaSnapshot::from_rows(vec![
            CatalogRow::new("zeta", 1, ColumnDescriptor::new("a", "text", true)),
            CatalogRow::new("Alpha", 1, ColumnDescriptor::new("a", "text", true)),
            CatalogRow::new("beta", 1, ColumnDescriptor::new("a", "text", true)),
        ]);
        let names: Vec<_> = snapshot.table_names().collect();
        assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_canonical_format() {
        let snapshot = SchemaSnapshot::from_rows(users_rows());
        let text = String::from_utf8(snapshot.to_canonical_bytes().unwrap()).unwrap();
        let expected = r#"{
  "users": [
    {
      "column_name": "id",
      "data_type": "integer",
      "is_nullable": "NO"
    },
    {
      "column_name": "name",
      "data_type": "text",
      "is_nullable": "YES"
    }
  ]
}"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_snapshot_serializes() {
        let snapshot = SchemaSnapshot::from_rows(Vec::new());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.to_canonical_bytes().unwrap(), b"{}");
    }

    #[test]
    fn test_canonical_bytes_parse_back() {
        let snapshot = SchemaSnapshot::from_rows(users_rows());
        let bytes = snapshot.to_canonical_bytes().unwrap();
        let parsed = SchemaSnapshot::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_nullability_from_catalog() {
        assert_eq!(Nullability::from_catalog("YES").unwrap(), Nullability::Nullable);
        assert_eq!(Nullability::from_catalog("NO").unwrap(), Nullability::NotNull);
        assert!(Nullability::from_catalog("maybe").is_err());
        assert_eq!(Nullability::NotNull.to_string(), "NO");
    }
}
