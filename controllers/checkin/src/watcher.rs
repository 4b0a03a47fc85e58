//! Kubernetes resource watchers.
//!
//! Each watcher wraps a `kube_runtime::Controller` and hands it to the
//! `controller-kit` engine, which re-fetches by key, applies per-key backoff
//! and records metrics. Streams reconnect on their own and run until a
//! shutdown signal arrives.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::{reconcile_check_in, reconcile_long_living_pod, Context};
use crate::reconciler::check_in::MANAGED_POD_LABEL;
use controller_kit::{engine, scoped_api, KubeStore, ProbeState, ReconcileMetrics};
use crds::{CheckIn, LongLivingPod};
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube_runtime::controller::Config as RuntimeControllerConfig;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::info;

/// Watches CheckIn and LongLivingPod resources.
pub struct Watcher {
    client: Client,
    config: ControllerConfig,
    ctx: Arc<Context<KubeStore>>,
    metrics: ReconcileMetrics,
    probe: Arc<ProbeState>,
}

impl Watcher {
    /// Number of controllers whose sync gates readiness.
    pub const CONTROLLERS: usize = 2;

    pub fn new(
        client: Client,
        config: ControllerConfig,
        ctx: Arc<Context<KubeStore>>,
        metrics: ReconcileMetrics,
        probe: Arc<ProbeState>,
    ) -> Self {
        Self {
            client,
            config,
            ctx,
            metrics,
            probe,
        }
    }

    fn runtime_config(&self) -> RuntimeControllerConfig {
        RuntimeControllerConfig::default()
            .concurrency(self.config.runtime.concurrency)
            .debounce(self.config.runtime.debounce)
    }

    /// Reconciles CheckIns, also triggered by changes to their managed Pods.
    pub async fn watch_check_ins(&self) -> Result<(), ControllerError> {
        info!("Starting CheckIn watcher");

        let namespace = self.config.runtime.namespace.as_deref();
        let check_ins = scoped_api::<CheckIn>(self.client.clone(), namespace);
        let pods = scoped_api::<Pod>(self.client.clone(), namespace);
        let pod_selector = format!("{}={}", MANAGED_POD_LABEL.0, MANAGED_POD_LABEL.1);

        let controller = Controller::new(check_ins, watcher::Config::default())
            .owns(pods, watcher::Config::default().labels(&pod_selector))
            .with_config(self.runtime_config())
            .shutdown_on_signal();

        engine::run(
            controller,
            "checkin",
            Arc::clone(&self.ctx),
            self.metrics.clone(),
            Arc::clone(&self.probe),
            reconcile_check_in::<KubeStore>,
        )
        .await;

        Ok(())
    }

    /// Reconciles LongLivingPods; each one requeues itself periodically.
    pub async fn watch_long_living_pods(&self) -> Result<(), ControllerError> {
        info!("Starting LongLivingPod watcher");

        let trackers = scoped_api::<LongLivingPod>(self.client.clone(), self.config.runtime.namespace.as_deref());

        let controller = Controller::new(trackers, watcher::Config::default())
            .with_config(self.runtime_config())
            .shutdown_on_signal();

        engine::run(
            controller,
            "long-living-pod",
            Arc::clone(&self.ctx),
            self.metrics.clone(),
            Arc::clone(&self.probe),
            reconcile_long_living_pod::<KubeStore>,
        )
        .await;

        Ok(())
    }
}
