//! Kubernetes resource watchers.
//!
//! ConfigDeployments are reconciled on their own changes and on changes to
//! the ConfigMaps and Deployments they own, so drift is repaired without
//! waiting for a spec edit.

use crate::error::ControllerError;
use crate::reconciler::{reconcile_config_deployment, Context};
use controller_kit::{engine, scoped_api, KubeStore, ProbeState, ReconcileMetrics, RuntimeConfig};
use crds::ConfigDeployment;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Client;
use kube_runtime::controller::Config as RuntimeControllerConfig;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::info;

/// Starts watching ConfigDeployment resources and their owned objects.
pub async fn watch_config_deployments(
    client: Client,
    config: RuntimeConfig,
    ctx: Arc<Context<KubeStore>>,
    metrics: ReconcileMetrics,
    probe: Arc<ProbeState>,
) -> Result<(), ControllerError> {
    info!("Starting ConfigDeployment watcher");

    let namespace = config.namespace.as_deref();
    let config_deployments = scoped_api::<ConfigDeployment>(client.clone(), namespace);
    let config_maps = scoped_api::<ConfigMap>(client.clone(), namespace);
    let deployments = scoped_api::<Deployment>(client, namespace);

    let controller = Controller::new(config_deployments, watcher::Config::default())
        .owns(config_maps, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .with_config(
            RuntimeControllerConfig::default()
                .concurrency(config.concurrency)
                .debounce(config.debounce),
        )
        .shutdown_on_signal();

    engine::run(
        controller,
        "config-deploy",
        ctx,
        metrics,
        probe,
        reconcile_config_deployment::<KubeStore>,
    )
    .await;

    Ok(())
}
