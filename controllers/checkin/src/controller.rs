//! Main controller implementation.
//!
//! Starts the CheckIn and LongLivingPod watchers plus the probe server in
//! background tasks and waits for the first one to finish. `/readyz` turns
//! ready once both watchers have synced their caches.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Context;
use crate::watcher::Watcher;
use controller_kit::{telemetry, KubeStore, ProbeState, ReconcileMetrics};
use kube::Client;
use prometheus::Registry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for CheckIn management.
pub struct Controller {
    check_in_watcher: JoinHandle<Result<(), ControllerError>>,
    long_living_pod_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing CheckIn Controller");

        let client = Client::try_default().await?;

        let registry = Registry::new();
        let metrics = ReconcileMetrics::register(&registry)?;
        let probe_state = Arc::new(ProbeState::new(Watcher::CONTROLLERS));

        let ctx = Arc::new(Context::new(KubeStore::new(client.clone()), config.tracker.clone()));
        let watcher = Arc::new(Watcher::new(client, config.clone(), ctx, metrics, Arc::clone(&probe_state)));

        let probe_addr = config.runtime.probe_addr;
        let probe_server = tokio::spawn({
            let state = Arc::clone(&probe_state);
            async move {
                telemetry::serve(probe_addr, registry, state)
                    .await
                    .map_err(ControllerError::from)
            }
        });

        let check_in_watcher = tokio::spawn({
            let watcher = Arc::clone(&watcher);
            async move { watcher.watch_check_ins().await }
        });

        let long_living_pod_watcher = tokio::spawn(async move { watcher.watch_long_living_pods().await });

        Ok(Self {
            check_in_watcher,
            long_living_pod_watcher,
            probe_server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("CheckIn Controller running");

        tokio::select! {
            result = &mut self.check_in_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("CheckIn watcher panicked: {}", e)))??;
            }
            result = &mut self.long_living_pod_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("LongLivingPod watcher panicked: {}", e)))??;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
            }
        }

        info!("CheckIn Controller stopped");
        Ok(())
    }
}
