//! Runtime configuration shared by the controllers.
//!
//! Loaded from environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `WATCH_NAMESPACE` | all namespaces |
//! | `RECONCILE_CONCURRENCY` | `3` |
//! | `RECONCILE_DEBOUNCE_MS` | `500` |
//! | `PROBE_ADDR` | `0.0.0.0:8081` |

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default reconcile concurrency per controller
pub const DEFAULT_CONCURRENCY: u16 = 3;

/// Default debounce in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Default probe server address
pub const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8081";

/// Settings every controller binary needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Namespace to watch (`None` = all namespaces)
    pub namespace: Option<String>,
    /// Maximum concurrent reconciliations per controller
    pub concurrency: u16,
    /// Quiet period after the last event before reconciling
    pub debounce: Duration,
    /// Bind address of the probe/metrics server
    pub probe_addr: SocketAddr,
}

impl RuntimeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let concurrency = parse_or(&lookup, "RECONCILE_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "RECONCILE_CONCURRENCY".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let debounce_ms = parse_or(&lookup, "RECONCILE_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;
        let probe_addr = match lookup("PROBE_ADDR") {
            Some(raw) => parse_value("PROBE_ADDR", &raw)?,
            None => parse_value("PROBE_ADDR", DEFAULT_PROBE_ADDR)?,
        };

        Ok(Self {
            namespace,
            concurrency,
            debounce: Duration::from_millis(debounce_ms),
            probe_addr,
        })
    }
}

/// Parses `key` through `lookup`, falling back to `default` when unset.
pub fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
