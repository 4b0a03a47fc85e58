//! LongLivingPod reconciler
//!
//! Every `requeue_interval` the tracker looks at the active Pod of its
//! CheckIn and, once that Pod has been running strictly longer than the
//! threshold, adds its UID to `observedLongLivedPodIDs`. The set only grows.

use super::Context;
use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use controller_kit::{ClusterStore, ObjectKey};
use crds::{
    managed_pod_name, set_condition, CheckIn, Condition, ConditionStatus, LongLivingPod,
    LONG_LIVED_POD_OBSERVED,
};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info};

/// Reason recorded on the `LongLivedPodObserved` condition
pub const THRESHOLD_EXCEEDED_REASON: &str = "ThresholdExceeded";

pub async fn reconcile_long_living_pod<S: ClusterStore>(
    key: ObjectKey,
    ctx: Arc<Context<S>>,
) -> Result<Action, ControllerError> {
    track_long_lived_pod(&key, &ctx, Utc::now()).await
}

/// One tracking pass evaluated at `now`.
pub(crate) async fn track_long_lived_pod<S: ClusterStore>(
    key: &ObjectKey,
    ctx: &Context<S>,
    now: DateTime<Utc>,
) -> Result<Action, ControllerError> {
    let requeue = Action::requeue(ctx.tracker.requeue_interval);

    let Some(mut tracker) = ctx.store.get_opt::<LongLivingPod>(&key.namespace, &key.name).await? else {
        debug!("LongLivingPod {} no longer exists, nothing to do", key);
        return Ok(Action::await_change());
    };

    let (namespace, check_in_name) = tracker.check_in_target();
    let namespace = namespace.unwrap_or_else(|| key.namespace.clone());
    let Some(check_in) = ctx.store.get_opt::<CheckIn>(&namespace, &check_in_name).await? else {
        return Err(ControllerError::CheckInNotFound(format!("{namespace}/{check_in_name}")));
    };

    let active_pod_id = check_in
        .status
        .as_ref()
        .map(|status| status.active_pod_id.as_str())
        .unwrap_or_default();
    if active_pod_id.is_empty() {
        debug!("CheckIn {}/{} has no active Pod yet", namespace, check_in_name);
        return Ok(requeue);
    }

    let pod_name = managed_pod_name(&check_in_name);
    let Some(pod) = ctx.store.get_opt::<Pod>(&namespace, &pod_name).await? else {
        debug!("Pod {}/{} not found", namespace, pod_name);
        return Ok(requeue);
    };
    let Some(pod_uid) = pod.uid() else {
        return Ok(requeue);
    };
    let Some(started) = pod_start_time(&pod) else {
        debug!("Pod {}/{} has not started yet", namespace, pod_name);
        return Ok(requeue);
    };

    let running_for = now.signed_duration_since(started);
    if running_for <= ctx.tracker.threshold {
        debug!(
            "Pod {}/{} running for {}s, threshold {}s",
            namespace,
            pod_name,
            running_for.num_seconds(),
            ctx.tracker.threshold.num_seconds()
        );
        return Ok(requeue);
    }

    let mut status = tracker.status.clone().unwrap_or_default();
    if !status.insert_pod_id(&pod_uid) {
        debug!("Pod {} already observed by LongLivingPod {}", pod_uid, key);
        return Ok(requeue);
    }
    set_condition(
        &mut status.conditions,
        Condition::new(
            LONG_LIVED_POD_OBSERVED,
            ConditionStatus::True,
            THRESHOLD_EXCEEDED_REASON,
            format!(
                "Pod {pod_name} ({pod_uid}) has been running for more than {}s",
                ctx.tracker.threshold.num_seconds()
            ),
        ),
        now,
    );

    tracker.status = Some(status);
    ctx.store.update_status(&tracker).await?;
    info!(
        "LongLivingPod {} observed Pod {} after {}s",
        tracker.name_any(),
        pod_uid,
        running_for.num_seconds()
    );

    Ok(requeue)
}

/// When the Pod's containers started, if reported.
pub fn pod_start_time(pod: &Pod) -> Option<DateTime<Utc>> {
    let start_time = pod.status.as_ref()?.start_time.as_ref()?;
    let raw = serde_json::to_value(start_time).ok()?;
    DateTime::parse_from_rfc3339(raw.as_str()?)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}
