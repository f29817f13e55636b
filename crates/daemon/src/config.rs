//! Daemon configuration (environment variables)
//!
//! | Variable | Default |
//! |---|---|
//! | `COURIER_DB_PATH` | `~/.courier/queues.db` |
//! | `COURIER_CONCURRENCY_LIMIT` | `10` |
//! | `COURIER_QUEUE_PREFIX` | empty |
//! | `COURIER_LOG_FORMAT` | `pretty` (`json` for structured output) |

use anyhow::{Context, Result};
use courier_core::domain::options::DEFAULT_CONCURRENCY_LIMIT;

pub const DEFAULT_DB_PATH: &str = "~/.courier/queues.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub concurrency_limit: usize,
    pub queue_prefix: String,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map instead of the environment)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("COURIER_DB_PATH")
            .unwrap_or_else(|| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());

        let concurrency_limit = match lookup("COURIER_CONCURRENCY_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid COURIER_CONCURRENCY_LIMIT: {raw}"))?,
            None => DEFAULT_CONCURRENCY_LIMIT,
        };

        let log_format = match lookup("COURIER_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            db_path,
            concurrency_limit,
            queue_prefix: lookup("COURIER_QUEUE_PREFIX").unwrap_or_default(),
            log_format,
        })
    }

    /// SQLite URL for `db_path` (in-memory paths pass through)
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = assert_ok!(DaemonConfig::from_lookup(lookup(&[])));
        assert_eq!(config.concurrency_limit, DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(config.queue_prefix, "");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.db_path.ends_with(".courier/queues.db"));
    }

    #[test]
    fn test_overrides() {
        let config = DaemonConfig::from_lookup(lookup(&[
            ("COURIER_DB_PATH", "sqlite::memory:"),
            ("COURIER_CONCURRENCY_LIMIT", "3"),
            ("COURIER_QUEUE_PREFIX", "dev-"),
            ("COURIER_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.concurrency_limit, 3);
        assert_eq!(config.queue_prefix, "dev-");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_concurrency_limit() {
        assert_err!(DaemonConfig::from_lookup(lookup(&[(
            "COURIER_CONCURRENCY_LIMIT",
            "many"
        )])));
    }

    #[test]
    fn test_file_path_becomes_url() {
        let config =
            DaemonConfig::from_lookup(lookup(&[("COURIER_DB_PATH", "/tmp/courier.db")])).unwrap();
        assert_eq!(config.database_url(), "sqlite:///tmp/courier.db");
    }
}
