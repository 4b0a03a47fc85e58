//! ConfigDeployment reconciler
//!
//! Re-reads the ConfigDeployment, then converges the owned ConfigMap and
//! Deployment:
//!
//! - ConfigMap: created if absent; `data` is overwritten when it differs,
//!   other metadata is left alone
//! - Deployment: created if absent; the full spec and the spec-hash marker
//!   are overwritten when the marker, replica count, image or config
//!   fingerprint annotation diverge from the desired state
//!
//! An existing object without a controller is adopted. One controlled by
//! another owner fails the reconcile with [`ControllerError::NotOwned`].

#[cfg(test)]
mod config_deployment_test;

use crate::error::ControllerError;
use crate::resources::{
    desired_state, first_image, template_annotation, CONFIG_HASH_ANNOTATION, SPEC_HASH_ANNOTATION,
};
use controller_kit::{controller_of, set_controller_reference, ClusterStore, ObjectKey};
use crds::ConfigDeployment;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info};

/// State shared by every reconciliation.
pub struct Context<S: ClusterStore> {
    pub store: S,
}

impl<S: ClusterStore> Context<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

/// Converges the ConfigDeployment identified by `key`.
pub async fn reconcile_config_deployment<S: ClusterStore>(
    key: ObjectKey,
    ctx: Arc<Context<S>>,
) -> Result<Action, ControllerError> {
    let Some(config_deployment) = ctx
        .store
        .get_opt::<ConfigDeployment>(&key.namespace, &key.name)
        .await?
    else {
        debug!("ConfigDeployment {} no longer exists, nothing to do", key);
        return Ok(Action::await_change());
    };

    let desired = desired_state(&config_deployment)?;
    debug!("ConfigDeployment {} config fingerprint {}", key, desired.fingerprint);

    ensure_config_map(&ctx.store, desired.config_map).await?;
    ensure_deployment(&ctx.store, desired.deployment).await?;

    Ok(Action::await_change())
}

async fn ensure_config_map<S: ClusterStore>(store: &S, desired: ConfigMap) -> Result<(), ControllerError> {
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();

    match store.get_opt::<ConfigMap>(&namespace, &name).await? {
        None => {
            store.create(&desired).await?;
            info!("Created ConfigMap {}/{}", namespace, name);
        }
        Some(mut existing) => {
            let adopted = claim(&mut existing, &desired)?;
            if !adopted && existing.data == desired.data {
                debug!("ConfigMap {}/{} up to date", namespace, name);
                return Ok(());
            }
            existing.data = desired.data;
            store.update(&existing).await?;
            info!("Updated ConfigMap {}/{} with new content", namespace, name);
        }
    }
    Ok(())
}

async fn ensure_deployment<S: ClusterStore>(store: &S, desired: Deployment) -> Result<(), ControllerError> {
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();

    match store.get_opt::<Deployment>(&namespace, &name).await? {
        None => {
            store.create(&desired).await?;
            info!("Created Deployment {}/{}", namespace, name);
        }
        Some(mut existing) => {
            let adopted = claim(&mut existing, &desired)?;
            if !adopted && !deployment_drifted(&existing, &desired) {
                debug!("Deployment {}/{} up to date", namespace, name);
                return Ok(());
            }
            let marker = desired.annotations().get(SPEC_HASH_ANNOTATION).cloned().unwrap_or_default();
            existing
                .annotations_mut()
                .insert(SPEC_HASH_ANNOTATION.to_string(), marker);
            existing.spec = desired.spec;
            store.update(&existing).await?;
            info!("Updated Deployment {}/{}", namespace, name);
        }
    }
    Ok(())
}

/// Makes sure `existing` is controlled by the owner of `desired`.
///
/// An object without a controller is adopted and `true` is returned so the
/// caller writes it back. An object controlled by anything else is left
/// untouched.
fn claim<K>(existing: &mut K, desired: &K) -> Result<bool, ControllerError>
where
    K: Resource<DynamicType = ()>,
{
    let owner = controller_of(desired)
        .cloned()
        .ok_or_else(|| ControllerError::OwnerReference(format!("desired {} has no controller", K::kind(&()))))?;

    match controller_of(existing) {
        Some(current) if current.uid == owner.uid => Ok(false),
        Some(current) => Err(ControllerError::NotOwned(format!(
            "{} {}/{} is controlled by {} {}",
            K::kind(&()),
            existing.namespace().unwrap_or_default(),
            existing.name_any(),
            current.kind,
            current.name
        ))),
        None => {
            info!(
                "Adopting {} {}/{} for {} {}",
                K::kind(&()),
                existing.namespace().unwrap_or_default(),
                existing.name_any(),
                owner.kind,
                owner.name
            );
            set_controller_reference(existing, owner);
            Ok(true)
        }
    }
}

/// Whether `observed` no longer matches what was last applied.
fn deployment_drifted(observed: &Deployment, desired: &Deployment) -> bool {
    let replicas = |d: &Deployment| d.spec.as_ref().and_then(|spec| spec.replicas);

    observed.annotations().get(SPEC_HASH_ANNOTATION) != desired.annotations().get(SPEC_HASH_ANNOTATION)
        || replicas(observed) != replicas(desired)
        || first_image(observed) != first_image(desired)
        || template_annotation(observed, CONFIG_HASH_ANNOTATION) != template_annotation(desired, CONFIG_HASH_ANNOTATION)
}
