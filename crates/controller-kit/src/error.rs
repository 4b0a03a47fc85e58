//! Cluster store and telemetry errors

use thiserror::Error;

/// Errors returned by a [`ClusterStore`](crate::ClusterStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Namespace of the lookup
        namespace: String,
        /// Name of the lookup
        name: String,
    },

    /// Create collided with an existing object
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Resource kind
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// Write was based on a stale resourceVersion
    #[error("conflict writing {kind} {namespace}/{name}: {message}")]
    Conflict {
        /// Resource kind
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
        /// Server-provided detail
        message: String,
    },

    /// Store temporarily unable to serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from the metrics registry or the probe server.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Metric registration failed
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Probe server could not bind or serve
    #[error("Probe server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be used
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Environment variable name
        key: String,
        /// Raw value found
        value: String,
        /// Why it was rejected
        reason: String,
    },
}
