//! Environment-driven configuration loading.
//!
//! Instances are numbered from 1 to `DB_COUNT`; every per-instance variable
//! carries that number as suffix (`PG_DRIFT_DB_HOST_2`, ...). Missing
//! per-instance values fall back to local development defaults.

use super::connection::{ConnectionDescriptor, DEFAULT_PORT};
use super::run::{DEFAULT_SCHEMA, DEFAULT_TARGET_FOLDER, RunConfig};
use crate::Result;
use crate::error::DriftError;
use std::str::FromStr;
use std::time::Duration;

/// Number of target instances
pub const DB_COUNT_VAR: &str = "DB_COUNT";
/// Folder for snapshot artifacts and reports
pub const TARGET_FOLDER_VAR: &str = "PG_DRIFT_TARGET_FOLDER";
/// Catalog schema to snapshot
pub const SCHEMA_VAR: &str = "PG_DRIFT_SCHEMA";
/// Maximum concurrent extractions
pub const MAX_CONCURRENCY_VAR: &str = "PG_DRIFT_MAX_CONCURRENCY";
/// Connect timeout in seconds
pub const CONNECT_TIMEOUT_VAR: &str = "PG_DRIFT_CONNECT_TIMEOUT_SECS";
/// Catalog query timeout in seconds
pub const QUERY_TIMEOUT_VAR: &str = "PG_DRIFT_QUERY_TIMEOUT_SECS";
/// Retries after a connection failure
pub const CONNECT_RETRIES_VAR: &str = "PG_DRIFT_CONNECT_RETRIES";

/// Largest accepted `DB_COUNT`.
pub const MAX_DB_COUNT: usize = 1000;

/// Everything a run needs, as loaded from the environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// One descriptor per instance, in instance-number order
    pub descriptors: Vec<ConnectionDescriptor>,
    /// Run-wide settings
    pub run: RunConfig,
}

impl EnvConfig {
    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    /// Returns a configuration error when `DB_COUNT` or any numeric variable
    /// fails to parse. Such errors are fatal for the run.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Same as [`EnvConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_count: usize = parse_var(&lookup, DB_COUNT_VAR, 1)?;
        if db_count == 0 {
            return Err(DriftError::configuration(format!(
                "{} must be at least 1",
                DB_COUNT_VAR
            )));
        }
        if db_count > MAX_DB_COUNT {
            return Err(DriftError::configuration(format!(
                "{} must not exceed {}, got {}",
                DB_COUNT_VAR, MAX_DB_COUNT, db_count
            )));
        }

        let mut descriptors = Vec::with_capacity(db_count);
        for i in 1..=db_count {
            let host = string_var(&lookup, &format!("PG_DRIFT_DB_HOST_{i}"), "localhost");
            let port: u16 = parse_var(&lookup, &format!("PG_DRIFT_DB_PORT_{i}"), DEFAULT_PORT)?;
            let user = string_var(&lookup, &format!("PG_DRIFT_DB_USER_{i}"), "postgres");
            let password = string_var(&lookup, &format!("PG_DRIFT_DB_PASSWORD_{i}"), "password");
            let database = string_var(&lookup, &format!("PG_DRIFT_DB_NAME_{i}"), "postgres");

            let descriptor = ConnectionDescriptor::new(host, port, user, password, database);
            descriptor.validate().map_err(|e| {
                DriftError::configuration(format!("instance {i}: {e}"))
            })?;
            descriptors.push(descriptor);
        }

        let run = RunConfig::new(string_var(&lookup, TARGET_FOLDER_VAR, DEFAULT_TARGET_FOLDER))
            .with_schema(string_var(&lookup, SCHEMA_VAR, DEFAULT_SCHEMA))
            .with_max_concurrency(parse_var(&lookup, MAX_CONCURRENCY_VAR, 1)?)
            .with_connect_timeout(Duration::from_secs(parse_var(
                &lookup,
                CONNECT_TIMEOUT_VAR,
                30,
            )?))
            .with_query_timeout(Duration::from_secs(parse_var(&lookup, QUERY_TIMEOUT_VAR, 30)?));
        let run = RunConfig {
            connect_retries: parse_var(&lookup, CONNECT_RETRIES_VAR, 0)?,
            ..run
        };
        run.validate()?;

        tracing::debug!(
            "Loaded configuration for {} instance(s), target folder {}",
            descriptors.len(),
            run.target_folder.display()
        );

        Ok(Self { descriptors, run })
    }
}

fn string_var<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            DriftError::configuration(format!("{key} has invalid value '{}'", raw.trim()))
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = EnvConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.descriptors.len(), 1);

        let descriptor = &config.descriptors[0];
        assert_eq!(descriptor.host(), "localhost");
        assert_eq!(descriptor.port(), 5432);
        assert_eq!(descriptor.user(), "postgres");
        assert_eq!(descriptor.database(), "postgres");
        assert_eq!(config.run.target_folder.to_str(), Some("metadata_exports"));
        assert_eq!(config.run.max_concurrency, 1);
    }

    #[test]
    fn test_multiple_instances() {
        let config = EnvConfig::from_lookup(lookup_from(&[
            ("DB_COUNT", "3"),
            ("PG_DRIFT_DB_HOST_1", "db1"),
            ("PG_DRIFT_DB_HOST_2", "db2"),
            ("PG_DRIFT_DB_PORT_2", "6432"),
            ("PG_DRIFT_DB_NAME_3", "orders"),
            ("PG_DRIFT_TARGET_FOLDER", "/tmp/exports"),
            ("PG_DRIFT_MAX_CONCURRENCY", "4"),
            ("PG_DRIFT_CONNECT_RETRIES", "2"),
        ]))
        .unwrap();

        let hosts: Vec<_> = config.descriptors.iter().map(|d| d.host()).collect();
        assert_eq!(hosts, vec!["db1", "db2", "localhost"]);
        assert_eq!(config.descriptors[1].port(), 6432);
        assert_eq!(config.descriptors[2].database(), "orders");
        assert_eq!(config.run.target_folder.to_str(), Some("/tmp/exports"));
        assert_eq!(config.run.max_concurrency, 4);
        assert_eq!(config.run.connect_retries, 2);
    }

    #[test]
    fn test_invalid_db_count_is_fatal() {
        for bad in ["abc", "-1", "", "0"] {
            let err = EnvConfig::from_lookup(lookup_from(&[("DB_COUNT", bad)])).unwrap_err();
            assert!(
                matches!(err, DriftError::Configuration { .. }),
                "DB_COUNT={bad:?} should be a configuration error"
            );
        }
    }

    #[test]
    fn test_db_count_upper_bound() {
        let max = usize::MAX.to_string();
        for huge in ["1001", "1000000000000000", max.as_str()] {
            let err = EnvConfig::from_lookup(lookup_from(&[("DB_COUNT", huge)])).unwrap_err();
            assert!(
                matches!(err, DriftError::Configuration { .. }),
                "DB_COUNT={huge} should be a configuration error"
            );
        }

        let config = EnvConfig::from_lookup(lookup_from(&[("DB_COUNT", "1000")])).unwrap();
        assert_eq!(config.descriptors.len(), MAX_DB_COUNT);
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        let err = EnvConfig::from_lookup(lookup_from(&[
            ("DB_COUNT", "2"),
            ("PG_DRIFT_DB_PORT_2", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PG_DRIFT_DB_PORT_2"));
    }

    #[test]
    fn test_password_not_in_configuration_errors() {
        let err = EnvConfig::from_lookup(lookup_from(&[
            ("PG_DRIFT_DB_PASSWORD_1", "supersecret"),
            ("PG_DRIFT_DB_PORT_1", "0"),
        ]))
        .unwrap_err();
        assert!(!err.to_string().contains("supersecret"));
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        temp_env::with_vars(
            vec![
                ("DB_COUNT", Some("2")),
                ("PG_DRIFT_DB_HOST_1", Some("primary")),
                ("PG_DRIFT_DB_HOST_2", Some("replica")),
                ("PG_DRIFT_SCHEMA", Some("billing")),
            ],
            || {
                let config = EnvConfig::from_env().unwrap();
                assert_eq!(config.descriptors.len(), 2);
                assert_eq!(config.descriptors[0].host(), "primary");
                assert_eq!(config.descriptors[1].host(), "replica");
                assert_eq!(config.run.schema, "billing");
            },
        );
    }
}
