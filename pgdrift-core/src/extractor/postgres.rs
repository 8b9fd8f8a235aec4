//! PostgreSQL catalog connector.
//!
//! Reads `information_schema.tables` joined with `information_schema.columns`
//! over a single dedicated connection per instance.
//!
//! # Security
//! - Sessions are switched to read-only before the catalog query runs
//! - The password is passed to the driver through `PgConnectOptions`, never
//!   through a formatted connection string
//! - Errors only ever mention the masked descriptor

use super::{CatalogConnector, CatalogSession};
use crate::config::{ConnectionDescriptor, RunConfig};
use crate::error::DriftError;
use crate::snapshot::{CatalogRow, ColumnDescriptor, Nullability};
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, Row};

/// Catalog query. Identifier domains are cast so they decode as plain text.
pub const CATALOG_QUERY: &str = r#"
    SELECT
        t.table_name::text AS table_name,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.is_nullable::text AS is_nullable,
        c.ordinal_position::int4 AS ordinal_position
    FROM information_schema.tables t
    JOIN information_schema.columns c
        ON t.table_name = c.table_name
        AND t.table_schema = c.table_schema
    WHERE t.table_schema = $1
    ORDER BY t.table_name, c.ordinal_position
"#;

/// Opens one dedicated PostgreSQL connection per extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    /// Creates the connector.
    pub fn new() -> Self {
        Self
    }

    fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(descriptor.host())
            .port(descriptor.port())
            .username(descriptor.user())
            .password(descriptor.password())
            .database(descriptor.database())
            .application_name(&format!("pgdrift-{}", env!("CARGO_PKG_VERSION")))
    }
}

#[async_trait]
impl CatalogConnector for PostgresConnector {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        config: &RunConfig,
    ) -> Result<Box<dyn CatalogSession>> {
        let options = Self::connect_options(descriptor);
        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| DriftError::connection_failed(descriptor.to_string(), e))?;

        if let Err(e) = setup_session(&mut conn, config).await {
            if let Err(close_err) = conn.close().await {
                tracing::warn!("Error closing connection to {}: {}", descriptor, close_err);
            }
            return Err(e);
        }

        Ok(Box::new(PostgresSession {
            conn: Some(conn),
            target: descriptor.to_string(),
        }))
    }
}

/// Applies session settings before any catalog access.
async fn setup_session(conn: &mut PgConnection, config: &RunConfig) -> Result<()> {
    let statements = [
        format!(
            "SET statement_timeout = '{}ms'",
            config.query_timeout.as_millis()
        ),
        "SET lock_timeout = '30s'".to_string(),
        "SET default_transaction_read_only = on".to_string(),
    ];

    for statement in &statements {
        sqlx::query(statement.as_str())
            .execute(&mut *conn)
            .await
            .map_err(|e| DriftError::query_failed("Failed to apply session settings", e))?;
    }

    Ok(())
}

struct PostgresSession {
    conn: Option<PgConnection>,
    target: String,
}

#[async_trait]
impl CatalogSession for PostgresSession {
    async fn fetch_catalog(&mut self, schema: &str) -> Result<Vec<CatalogRow>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DriftError::query(format!("Session to {} already closed", self.target)))?;

        let rows = sqlx::query(CATALOG_QUERY)
            .bind(schema)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                DriftError::query_failed(
                    format!("Failed to query catalog of schema '{}' on {}", schema, self.target),
                    e,
                )
            })?;

        rows.iter().map(parse_catalog_row).collect()
    }

    async fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().await.map_err(|e| {
                DriftError::connection_failed(format!("{} (while closing)", self.target), e)
            }),
            None => Ok(()),
        }
    }
}

/// Extension trait for extracting typed values from catalog rows
/// with consistent error handling.
trait RowExt {
    fn get_field<'r, T>(&'r self, field_name: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
}

impl RowExt for PgRow {
    fn get_field<'r, T>(&'r self, field_name: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        self.try_get(field_name).map_err(|e| {
            DriftError::query_failed(format!("Failed to parse field '{}' from catalog", field_name), e)
        })
    }
}

fn parse_catalog_row(row: &PgRow) -> Result<CatalogRow> {
    let table_name: String = row.get_field("table_name")?;
    let column_name: String = row.get_field("column_name")?;
    let data_type: String = row.get_field("data_type")?;
    let is_nullable: String = row.get_field("is_nullable")?;
    let ordinal_position: i32 = row.get_field("ordinal_position")?;

    Ok(CatalogRow::new(
        table_name,
        ordinal_position,
        ColumnDescriptor::new(column_name, data_type, Nullability::from_catalog(&is_nullable)?),
    ))
}
