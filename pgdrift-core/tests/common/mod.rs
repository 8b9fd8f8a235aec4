//! Shared fixtures for pgdrift-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use pgdrift_core::config::{ConnectionDescriptor, RunConfig};
use pgdrift_core::error::DriftError;
use pgdrift_core::extractor::{CatalogConnector, CatalogSession};
use pgdrift_core::snapshot::{CatalogRow, ColumnDescriptor};
use pgdrift_core::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What an in-memory instance does when connected to.
#[derive(Debug, Clone)]
pub enum Instance {
    /// Serves these catalog rows, after an optional delay
    Serving {
        rows: Vec<CatalogRow>,
        delay: Duration,
    },
    /// Refuses every connection
    Unreachable,
}

/// Catalog connector backed by per-host fixtures.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    instances: HashMap<String, Instance>,
    pub open_sessions: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(mut self, host: &str, rows: Vec<CatalogRow>) -> Self {
        self.instances.insert(
            host.to_string(),
            Instance::Serving {
                rows,
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn serving_after(mut self, host: &str, rows: Vec<CatalogRow>, delay: Duration) -> Self {
        self.instances
            .insert(host.to_string(), Instance::Serving { rows, delay });
        self
    }

    pub fn unreachable(mut self, host: &str) -> Self {
        self.instances.insert(host.to_string(), Instance::Unreachable);
        self
    }
}

struct InMemorySession {
    rows: Vec<CatalogRow>,
    delay: Duration,
    open_sessions: Arc<AtomicUsize>,
}

#[async_trait]
impl CatalogSession for InMemorySession {
    async fn fetch_catalog(&mut self, _schema: &str) -> Result<Vec<CatalogRow>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.rows.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl CatalogConnector for InMemoryConnector {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        _config: &RunConfig,
    ) -> Result<Box<dyn CatalogSession>> {
        match self.instances.get(descriptor.host()) {
            Some(Instance::Serving { rows, delay }) => {
                self.open_sessions.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(InMemorySession {
                    rows: rows.clone(),
                    delay: *delay,
                    open_sessions: Arc::clone(&self.open_sessions),
                }))
            }
            Some(Instance::Unreachable) | None => Err(DriftError::connection_failed(
                descriptor.to_string(),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
        }
    }
}

/// `users(id integer NOT NULL, name text NULL)`
pub fn users_table() -> Vec<CatalogRow> {
    vec![
        CatalogRow::new("users", 1, ColumnDescriptor::new("id", "integer", false)),
        CatalogRow::new("users", 2, ColumnDescriptor::new("name", "text", true)),
    ]
}

/// `users_table()` plus `age integer NULL`
pub fn users_table_with_age() -> Vec<CatalogRow> {
    let mut rows = users_table();
    rows.push(CatalogRow::new("users", 3, ColumnDescriptor::new("age", "integer", true)));
    rows
}

pub fn descriptor(host: &str, database: &str) -> ConnectionDescriptor {
    ConnectionDescriptor::new(host, 5432, "drift_reader", "s3cr3t-pw", database)
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

pub fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    files_in(dir)
        .into_iter()
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .collect()
}
