//! # Configuration
//!
//! Runtime settings loaded from the environment (and `.env` via dotenvy in the
//! binary). Every key is optional.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "db.json";
pub const DEFAULT_DB_CONFIG_PATH: &str = ".db.config.json";
pub const DEFAULT_NOTIFIER_URL: &str = "http://localhost:5000";
pub const DEFAULT_SAVE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_NOTIFY_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_NOTIFIER_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_CONCURRENT_DELIVERIES: usize = 16;

#[derive(Debug, Clone)]
pub struct Config {
    /// Reminder data file (JSON array)
    pub db_path: PathBuf,
    /// Metadata file holding the id counter and payload checksum
    pub db_config_path: PathBuf,
    /// Base URL of the downstream notifier service
    pub notifier_url: String,
    pub log_level: String,
    pub save_interval: Duration,
    pub notify_interval: Duration,
    pub notifier_timeout: Duration,
    pub max_concurrent_deliveries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            db_config_path: PathBuf::from(DEFAULT_DB_CONFIG_PATH),
            notifier_url: DEFAULT_NOTIFIER_URL.to_string(),
            log_level: "info".to_string(),
            save_interval: Duration::from_secs(DEFAULT_SAVE_INTERVAL_SECS),
            notify_interval: Duration::from_millis(DEFAULT_NOTIFY_INTERVAL_MS),
            notifier_timeout: Duration::from_secs(DEFAULT_NOTIFIER_TIMEOUT_SECS),
            max_concurrent_deliveries: DEFAULT_MAX_CONCURRENT_DELIVERIES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup so tests don't have to
    /// touch process-wide environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let save_secs = parse_number(&lookup, "SAVE_INTERVAL_SECS", DEFAULT_SAVE_INTERVAL_SECS)?;
        let notify_ms = parse_number(&lookup, "NOTIFY_INTERVAL_MS", DEFAULT_NOTIFY_INTERVAL_MS)?;
        let timeout_secs =
            parse_number(&lookup, "NOTIFIER_TIMEOUT_SECS", DEFAULT_NOTIFIER_TIMEOUT_SECS)?;
        let max_deliveries = parse_number(
            &lookup,
            "MAX_CONCURRENT_DELIVERIES",
            DEFAULT_MAX_CONCURRENT_DELIVERIES as u64,
        )?;

        if save_secs == 0 || notify_ms == 0 || max_deliveries == 0 {
            return Err(anyhow!(
                "SAVE_INTERVAL_SECS, NOTIFY_INTERVAL_MS and MAX_CONCURRENT_DELIVERIES must be positive"
            ));
        }

        Ok(Config {
            db_path: lookup("REMINDERS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            db_config_path: lookup("REMINDERS_DB_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_config_path),
            notifier_url: lookup("NOTIFIER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.notifier_url),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            save_interval: Duration::from_secs(save_secs),
            notify_interval: Duration::from_millis(notify_ms),
            notifier_timeout: Duration::from_secs(timeout_secs),
            max_concurrent_deliveries: max_deliveries as usize,
        })
    }
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("db.json"));
        assert_eq!(config.db_config_path, PathBuf::from(".db.config.json"));
        assert_eq!(config.notifier_url, "http://localhost:5000");
        assert_eq!(config.save_interval, Duration::from_secs(30));
        assert_eq!(config.notify_interval, Duration::from_secs(1));
        assert_eq!(config.notifier_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("REMINDERS_DB_PATH", "/var/lib/reminders/db.json"),
            ("NOTIFIER_URL", "http://notifier:9000/"),
            ("NOTIFY_INTERVAL_MS", "250"),
            ("MAX_CONCURRENT_DELIVERIES", "4"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/reminders/db.json"));
        assert_eq!(config.notifier_url, "http://notifier:9000");
        assert_eq!(config.notify_interval, Duration::from_millis(250));
        assert_eq!(config.max_concurrent_deliveries, 4);
    }

    #[test]
    fn test_rejects_malformed_and_zero_values() {
        assert!(Config::from_lookup(lookup_from(&[("SAVE_INTERVAL_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("NOTIFY_INTERVAL_MS", "0")])).is_err());
    }
}
