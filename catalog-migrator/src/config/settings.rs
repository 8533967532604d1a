//! Connection settings read from the environment.
use std::env;
use std::time::Duration;

use crate::errors::MigratorError;

/// Default maximum number of connections per pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a pooled connection, in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default per-statement timeout, in seconds.
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

/// Settings for the two database connections of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub kmedia_database_url: String,
    /// Absent only for dry runs, which never open the target database.
    pub mdb_database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Settings {
    /// Reads the settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KMEDIA_DATABASE_URL`: legacy catalog (required)
    /// - `MDB_DATABASE_URL`: target catalog (required unless `dry_run`)
    /// - `PG_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `PG_ACQUIRE_TIMEOUT_SECS`: connection acquire timeout (default: 30)
    /// - `PG_STATEMENT_TIMEOUT_SECS`: statement timeout (default: 60)
    pub fn from_env(dry_run: bool) -> Result<Self, MigratorError> {
        let mdb_database_url = if dry_run {
            optional("MDB_DATABASE_URL")
        } else {
            Some(required("MDB_DATABASE_URL")?)
        };

        Ok(Self {
            kmedia_database_url: required("KMEDIA_DATABASE_URL")?,
            mdb_database_url,
            max_connections: parsed("PG_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            acquire_timeout: Duration::from_secs(parsed(
                "PG_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?),
            statement_timeout: Duration::from_secs(parsed(
                "PG_STATEMENT_TIMEOUT_SECS",
                DEFAULT_STATEMENT_TIMEOUT_SECS,
            )?),
        })
    }
}

fn required(name: &str) -> Result<String, MigratorError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MigratorError::config(format!("{name} must be set"))),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, MigratorError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| MigratorError::config(format!("{name} has an invalid value: {value:?}"))),
        Err(_) => Ok(default),
    }
}
