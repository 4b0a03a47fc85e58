//! Controller-specific error types.

use controller_kit::{ConfigError, StoreError, TelemetryError};
use thiserror::Error;

/// Errors that can occur in the ConfigDeployment Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Cluster store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Kubernetes client setup error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The owner has no identity yet, so no owner reference can be built
    #[error("Cannot build owner reference: {0}")]
    OwnerReference(String),

    /// A ConfigMap or Deployment with the managed name is controlled by another owner
    #[error("Object not owned by this ConfigDeployment: {0}")]
    NotOwned(String),

    /// The ConfigDeployment spec cannot be converged
    #[error("Invalid ConfigDeployment spec: {0}")]
    InvalidSpec(String),

    /// Desired state could not be serialized for hashing
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Metrics or probe server error
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
