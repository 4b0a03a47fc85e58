//! Controller configuration.
//!
//! Shared runtime settings come from [`RuntimeConfig`]; the longevity
//! tracker adds:
//!
//! - `LONGEVITY_THRESHOLD_SECS` (default 120): how long a Pod must have been
//!   running before it is recorded
//! - `LONGEVITY_REQUEUE_SECS` (default 30): how often a LongLivingPod is
//!   re-examined

use crate::error::ControllerError;
use controller_kit::config::parse_or;
use controller_kit::{ConfigError, RuntimeConfig};
use std::time::Duration;

/// Default longevity threshold in seconds
pub const DEFAULT_THRESHOLD_SECS: i64 = 120;

/// Default re-examination interval in seconds
pub const DEFAULT_REQUEUE_SECS: u64 = 30;

/// Longevity tracker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    /// A Pod is long-lived once it has run strictly longer than this
    pub threshold: chrono::Duration,
    /// Delay before a LongLivingPod is examined again
    pub requeue_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            threshold: chrono::Duration::seconds(DEFAULT_THRESHOLD_SECS),
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub runtime: RuntimeConfig,
    pub tracker: TrackerSettings,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let runtime = RuntimeConfig::from_lookup(&lookup)?;

        let threshold_secs: i64 = parse_or(&lookup, "LONGEVITY_THRESHOLD_SECS", DEFAULT_THRESHOLD_SECS)?;
        if threshold_secs < 0 {
            return Err(ConfigError::Invalid {
                key: "LONGEVITY_THRESHOLD_SECS".to_string(),
                value: threshold_secs.to_string(),
                reason: "must not be negative".to_string(),
            }
            .into());
        }
        let requeue_secs: u64 = parse_or(&lookup, "LONGEVITY_REQUEUE_SECS", DEFAULT_REQUEUE_SECS)?;
        if requeue_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "LONGEVITY_REQUEUE_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        Ok(Self {
            runtime,
            tracker: TrackerSettings {
                threshold: chrono::Duration::seconds(threshold_secs),
                requeue_interval: Duration::from_secs(requeue_secs),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_tracker_defaults() {
        let config = ControllerConfig::from_lookup(no_vars).unwrap();
        assert_eq!(config.tracker, TrackerSettings::default());
        assert_eq!(config.tracker.threshold.num_seconds(), 120);
        assert_eq!(config.tracker.requeue_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_tracker_overrides() {
        let config = ControllerConfig::from_lookup(|key| match key {
            "LONGEVITY_THRESHOLD_SECS" => Some("10".to_string()),
            "LONGEVITY_REQUEUE_SECS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.tracker.threshold.num_seconds(), 10);
        assert_eq!(config.tracker.requeue_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_tracker_values() {
        for (key, value) in [
            ("LONGEVITY_THRESHOLD_SECS", "-1"),
            ("LONGEVITY_THRESHOLD_SECS", "two minutes"),
            ("LONGEVITY_REQUEUE_SECS", "0"),
        ] {
            let result = ControllerConfig::from_lookup(|k| (k == key).then(|| value.to_string()));
            assert!(
                matches!(result, Err(ControllerError::InvalidConfig(_))),
                "{key}={value} should be rejected"
            );
        }
    }
}
