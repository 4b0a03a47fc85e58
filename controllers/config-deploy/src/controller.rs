//! Main controller implementation.

use crate::error::ControllerError;
use crate::reconciler::Context;
use crate::watcher::watch_config_deployments;
use controller_kit::{telemetry, KubeStore, ProbeState, ReconcileMetrics, RuntimeConfig};
use kube::Client;
use prometheus::Registry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for ConfigDeployment management.
pub struct Controller {
    config_deployment_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: RuntimeConfig) -> Result<Self, ControllerError> {
        info!("Initializing ConfigDeployment Controller");

        let client = Client::try_default().await?;

        let registry = Registry::new();
        let metrics = ReconcileMetrics::register(&registry)?;
        let probe_state = Arc::new(ProbeState::new(1));
        let ctx = Arc::new(Context::new(KubeStore::new(client.clone())));

        let probe_addr = config.probe_addr;
        let probe_server = tokio::spawn({
            let state = Arc::clone(&probe_state);
            async move {
                telemetry::serve(probe_addr, registry, state)
                    .await
                    .map_err(ControllerError::from)
            }
        });

        let config_deployment_watcher = tokio::spawn(async move {
            watch_config_deployments(client, config, ctx, metrics, probe_state).await
        });

        Ok(Self {
            config_deployment_watcher,
            probe_server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("ConfigDeployment Controller running");

        tokio::select! {
            result = &mut self.config_deployment_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("ConfigDeployment watcher panicked: {}", e)))??;
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))??;
            }
        }

        info!("ConfigDeployment Controller stopped");
        Ok(())
    }
}
