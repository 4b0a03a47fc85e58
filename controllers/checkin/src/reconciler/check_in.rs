//! CheckIn reconciler
//!
//! Ensures the managed Pod `<name>-pod` exists, owned by the CheckIn, and
//! records its UID in the CheckIn status. Status is derived from what is
//! observed: whenever the Pod's UID differs from `activePodID` it becomes
//! the active Pod and is appended to `podHistory`. Nothing is written when
//! the Pod is already recorded.

use super::Context;
use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use controller_kit::{controller_reference, is_controlled_by, ClusterStore, ObjectKey, StoreError};
use crds::{managed_pod_name, set_condition, CheckIn, Condition, ConditionStatus, CHECK_IN_COMPLETED};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Label key/value carried by every managed Pod
pub const MANAGED_POD_LABEL: (&str, &str) = ("app", "checkin");

/// Container name inside the managed Pod
pub const CONTAINER_NAME: &str = "checkin-container";

/// Reason recorded on the `Completed` condition
pub const POD_RUNNING_REASON: &str = "PodRunning";

/// Builds the Pod a CheckIn should own.
pub fn desired_pod(check_in: &CheckIn) -> Result<Pod, ControllerError> {
    let name = check_in.name_any();
    let namespace = check_in.namespace().unwrap_or_default();
    let owner = controller_reference(check_in)
        .ok_or_else(|| ControllerError::OwnerReference(format!("CheckIn {namespace}/{name} has no UID")))?;

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(managed_pod_name(&name)),
            namespace: Some(namespace),
            labels: Some(BTreeMap::from([(
                MANAGED_POD_LABEL.0.to_string(),
                MANAGED_POD_LABEL.1.to_string(),
            )])),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: CONTAINER_NAME.to_string(),
                image: Some(check_in.spec.pod_image.clone()),
                ..Default::default()
            }],
            restart_policy: Some("Always".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Converges the CheckIn identified by `key`.
pub async fn reconcile_check_in<S: ClusterStore>(
    key: ObjectKey,
    ctx: Arc<Context<S>>,
) -> Result<Action, ControllerError> {
    let Some(check_in) = ctx.store.get_opt::<CheckIn>(&key.namespace, &key.name).await? else {
        debug!("CheckIn {} no longer exists, nothing to do", key);
        return Ok(Action::await_change());
    };

    let desired = desired_pod(&check_in)?;
    let pod = ensure_pod(&ctx.store, &check_in, desired).await?;
    record_active_pod(&ctx.store, check_in, &pod, Utc::now()).await?;

    Ok(Action::await_change())
}

/// Returns the managed Pod, creating it if absent.
async fn ensure_pod<S: ClusterStore>(store: &S, check_in: &CheckIn, desired: Pod) -> Result<Pod, ControllerError> {
    let namespace = desired.namespace().unwrap_or_default();
    let pod_name = desired.name_any();

    let pod = match store.get_opt::<Pod>(&namespace, &pod_name).await? {
        Some(existing) => {
            debug!("Pod {}/{} already exists", namespace, pod_name);
            existing
        }
        None => match store.create(&desired).await {
            Ok(created) => {
                info!("Created Pod {}/{} for CheckIn {}", namespace, pod_name, check_in.name_any());
                created
            }
            // Created concurrently between our read and write
            Err(StoreError::AlreadyExists { .. }) => store.get::<Pod>(&namespace, &pod_name).await?,
            Err(e) => return Err(e.into()),
        },
    };

    let owner_uid = check_in.uid().unwrap_or_default();
    if !is_controlled_by(&pod, &owner_uid) {
        return Err(ControllerError::PodNotOwned(format!("{namespace}/{pod_name}")));
    }
    Ok(pod)
}

/// Makes `pod` the active Pod of `check_in`, writing status only on change.
///
/// Returns `true` if the status was written.
async fn record_active_pod<S: ClusterStore>(
    store: &S,
    mut check_in: CheckIn,
    pod: &Pod,
    now: DateTime<Utc>,
) -> Result<bool, ControllerError> {
    let Some(pod_uid) = pod.uid() else {
        debug!("Pod {} has no UID yet", pod.name_any());
        return Ok(false);
    };

    let mut status = check_in.status.clone().unwrap_or_default();
    if status.active_pod_id == pod_uid {
        debug!("Pod {} already recorded for CheckIn {}", pod_uid, check_in.name_any());
        return Ok(false);
    }

    status.active_pod_id = pod_uid.clone();
    if !status.pod_history.contains(&pod_uid) {
        status.pod_history.push(pod_uid.clone());
    }
    set_condition(
        &mut status.conditions,
        Condition::new(
            CHECK_IN_COMPLETED,
            ConditionStatus::True,
            POD_RUNNING_REASON,
            format!("Checked in successfully with Pod {pod_uid}"),
        ),
        now,
    );

    check_in.status = Some(status);
    store.update_status(&check_in).await?;
    info!("CheckIn {} now tracks Pod {}", check_in.name_any(), pod_uid);
    Ok(true)
}
