//! Configuration types for drift-check runs.
//!
//! # Module Structure
//! - `connection`: Per-instance `ConnectionDescriptor` with masked credentials
//! - `run`: Run-wide `RunConfig` (folders, schema, concurrency, timeouts)
//! - `env`: Loading both from `DB_COUNT` / `PG_DRIFT_*` environment variables

mod connection;
mod env;
mod run;

pub use connection::{ConnectionDescriptor, DEFAULT_PORT};
pub use env::{
    CONNECT_RETRIES_VAR, CONNECT_TIMEOUT_VAR, DB_COUNT_VAR, EnvConfig, MAX_CONCURRENCY_VAR,
    MAX_DB_COUNT, QUERY_TIMEOUT_VAR, SCHEMA_VAR, TARGET_FOLDER_VAR,
};
pub use run::{DEFAULT_SCHEMA, DEFAULT_TARGET_FOLDER, RunConfig};
