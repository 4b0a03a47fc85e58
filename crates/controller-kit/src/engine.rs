//! Reconciliation engine adapter.
//!
//! Drives a `kube_runtime::Controller` with a key-based reconcile function.
//! The controller handles watching, per-key serialization and deduplication;
//! this module adds:
//!
//! - conversion of the triggering object into an [`ObjectKey`], so
//!   reconcilers always re-fetch current state instead of trusting the event
//! - per-key exponential backoff on errors, dropped after a success or once
//!   the object has left the cache
//! - readiness once the controller's cache has finished its initial sync
//! - reconcile metrics and logging

use crate::backoff::BackoffRegistry;
use crate::telemetry::{ProbeState, ReconcileMetrics};
use futures::StreamExt;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::{Action, Error as RunError};
use kube_runtime::Controller;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Namespace and name identifying one reconciliation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Namespace (empty for cluster-scoped objects)
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Creates a key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object.
    pub fn from_resource<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Shared state handed to every reconciliation by the engine.
struct EngineContext<C> {
    controller: &'static str,
    inner: Arc<C>,
    backoff: BackoffRegistry,
    metrics: ReconcileMetrics,
}

/// Runs `controller` until its watch streams end or shutdown is signalled.
///
/// `reconcile_fn` receives the key of the object to converge and the
/// controller context; errors it returns are requeued with per-key
/// exponential backoff. `probe` is told once the primary cache is synced.
pub async fn run<K, C, F, Fut, E>(
    controller: Controller<K>,
    name: &'static str,
    ctx: Arc<C>,
    metrics: ReconcileMetrics,
    probe: Arc<ProbeState>,
    reconcile_fn: F,
) where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static,
    C: Send + Sync + 'static,
    F: Fn(ObjectKey, Arc<C>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Action, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let engine = Arc::new(EngineContext {
        controller: name,
        inner: ctx,
        backoff: BackoffRegistry::default(),
        metrics,
    });

    let reconcile = move |obj: Arc<K>, engine: Arc<EngineContext<C>>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = ObjectKey::from_resource(obj.as_ref());
            debug!(controller = engine.controller, key = %key, "Reconciling");

            let started = Instant::now();
            let result = reconcile_fn(key.clone(), Arc::clone(&engine.inner)).await;
            engine.metrics.observe(engine.controller, started, result.is_ok());

            if result.is_ok() {
                engine.backoff.reset(&key.to_string());
            }
            result
        }
    };

    let error_policy = |obj: Arc<K>, err: &E, engine: Arc<EngineContext<C>>| {
        let key = ObjectKey::from_resource(obj.as_ref());
        let delay = engine.backoff.next_delay(&key.to_string());
        warn!(
            controller = engine.controller,
            key = %key,
            retry_in = ?delay,
            "Reconciliation failed: {}", err
        );
        Action::requeue(delay)
    };

    let cache = controller.store();
    let synced = async move {
        match cache.wait_until_ready().await {
            Ok(()) => {
                info!(controller = name, "Initial sync complete");
                probe.mark_synced();
            }
            Err(e) => warn!(controller = name, "Cache never synced: {}", e),
        }
    };

    let drained = Arc::clone(&engine);
    let reconciling = controller
        .run(reconcile, error_policy, engine)
        .for_each(move |res| {
            let engine = Arc::clone(&drained);
            async move {
                match res {
                    Ok((obj, action)) => debug!(object = %obj.name, ?action, "Reconciled"),
                    Err(RunError::ObjectNotFound(obj_ref)) => {
                        forget_missing(&engine.backoff, obj_ref.namespace.as_deref(), &obj_ref.name);
                        debug!(controller = engine.controller, object = %obj_ref.name, "Object left the cache");
                    }
                    Err(e) => debug!("Controller event not reconciled: {}", e),
                }
            }
        });

    futures::future::join(synced, reconciling).await;

    info!(controller = name, "Controller stopped");
}

/// Drops the retry state of an object that was deleted while failing.
fn forget_missing(backoff: &BackoffRegistry, namespace: Option<&str>, name: &str) {
    backoff.reset(&ObjectKey::new(namespace.unwrap_or_default(), name).to_string());
}
