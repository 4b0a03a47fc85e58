//! Controller Kit
//!
//! Shared plumbing for the tracker controllers:
//!
//! - **Cluster store**: a typed get/create/update/update-status client
//!   ([`ClusterStore`]) backed by `kube::Api` ([`KubeStore`]), with an
//!   in-memory implementation for unit tests (`test-util` feature)
//! - **Engine adapter**: drives `kube_runtime::Controller` with per-key
//!   exponential backoff and reconcile metrics ([`engine`])
//! - **Configuration**: environment-driven [`RuntimeConfig`]
//! - **Probes**: `/healthz`, `/readyz` and `/metrics` ([`telemetry`])
//!
//! # Example
//!
//! ```no_run
//! use controller_kit::{ClusterStore, KubeStore};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeStore::new(client);
//!
//! if let Some(pod) = store.get_opt::<Pod>("default", "demo-pod").await? {
//!     println!("found {:?}", pod.metadata.uid);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod config;
pub mod engine;
pub mod error;
pub mod kube_store;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod owner;
pub mod store;
pub mod telemetry;

pub use backoff::{BackoffRegistry, ExponentialBackoff};
pub use engine::ObjectKey;
pub use config::RuntimeConfig;
pub use error::{ConfigError, StoreError, TelemetryError};
pub use kube_store::{scoped_api, KubeStore};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterStore, Verb};
pub use owner::{controller_of, controller_reference, is_controlled_by, set_controller_reference};
pub use store::{ClusterStore, StoreObject};
pub use telemetry::{ProbeState, ReconcileMetrics};
