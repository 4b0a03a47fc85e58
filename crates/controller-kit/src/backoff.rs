//! # Exponential Backoff
//!
//! Retry delays for failed reconciliations. Each object key gets its own
//! sequence, doubling from the base delay up to a cap, and reset after a
//! successful reconciliation.
//!
//! Default sequence: 1s, 2s, 4s, 8s, ... 256s, 300s (max).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default first retry delay in seconds
pub const DEFAULT_BASE_SECONDS: u64 = 1;

/// Default maximum retry delay in seconds
pub const DEFAULT_MAX_SECONDS: u64 = 300;

/// Exponential backoff calculator
///
/// Each backoff is twice the previous one, capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay in seconds (for reset)
    base_seconds: u64,
    /// Current delay in seconds
    current_seconds: u64,
    /// Maximum delay in seconds
    max_seconds: u64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_SECONDS, DEFAULT_MAX_SECONDS)
    }
}

impl ExponentialBackoff {
    /// Create a new backoff with the given base and maximum delays in seconds
    #[must_use]
    pub fn new(base_seconds: u64, max_seconds: u64) -> Self {
        Self {
            base_seconds,
            current_seconds: base_seconds.min(max_seconds),
            max_seconds,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_seconds;
        self.current_seconds = self.current_seconds.saturating_mul(2).min(self.max_seconds);
        result_seconds
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current_seconds = self.base_seconds.min(self.max_seconds);
    }
}

/// Per-object backoff state, keyed by `namespace/name`.
#[derive(Debug)]
pub struct BackoffRegistry {
    base_seconds: u64,
    max_seconds: u64,
    states: Mutex<HashMap<String, ExponentialBackoff>>,
}

impl Default for BackoffRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_SECONDS, DEFAULT_MAX_SECONDS)
    }
}

impl BackoffRegistry {
    /// Creates a registry whose sequences use the given delays in seconds.
    pub fn new(base_seconds: u64, max_seconds: u64) -> Self {
        Self {
            base_seconds,
            max_seconds,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Next retry delay for `key`, advancing its sequence.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.to_string())
            .or_insert_with(|| ExponentialBackoff::new(self.base_seconds, self.max_seconds))
            .next_backoff()
    }

    /// Forgets the sequence for `key`, after a success or once the object is gone.
    pub fn reset(&self, key: &str) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
