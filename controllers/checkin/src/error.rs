//! Controller-specific error types.
//!
//! Store, configuration and telemetry failures come from `controller-kit`;
//! the variants below cover what only these reconcilers can detect.

use controller_kit::{ConfigError, StoreError, TelemetryError};
use thiserror::Error;

/// Errors that can occur in the CheckIn Controller.
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

    /// A Pod with the managed name exists but belongs to something else
    #[error("Pod not controlled by this CheckIn: {0}")]
    PodNotOwned(String),

    /// The CheckIn a LongLivingPod observes does not exist
    #[error("CheckIn not found: {0}")]
    CheckInNotFound(String),

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
