//! LongLivingPod CRD
//!
//! Tracks which Pods of a designated CheckIn have stayed up past the
//! longevity threshold.

use crate::conditions::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// CheckIn observed when `spec.checkInRef` is not set
pub const DEFAULT_CHECK_IN_NAME: &str = "checkin-rsc";

/// Condition type set when a Pod is added to the observed set
pub const LONG_LIVED_POD_OBSERVED: &str = "LongLivedPodObserved";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[kube(
    group = "tracker.meng.xu",
    version = "v1alpha1",
    kind = "LongLivingPod",
    namespaced,
    status = "LongLivingPodStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct LongLivingPodSpec {
    /// CheckIn whose managed Pod is observed (defaults to `checkin-rsc`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_ref: Option<CheckInRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRef {
    /// Name of the CheckIn
    pub name: String,

    /// Namespace (defaults to same namespace as the LongLivingPod)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LongLivingPodStatus {
    /// Pod UIDs that outlived the threshold, without duplicates, in insertion order
    ///
    /// Also accepts the older `longLivingPods` key.
    #[serde(default, rename = "observedLongLivedPodIDs", alias = "longLivingPods")]
    pub observed_long_lived_pod_ids: Vec<String>,

    /// Latest observations, keyed by condition type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl LongLivingPodStatus {
    /// Appends `pod_id` unless already present. Returns `true` if it was added.
    pub fn insert_pod_id(&mut self, pod_id: &str) -> bool {
        if self.observed_long_lived_pod_ids.iter().any(|id| id == pod_id) {
            return false;
        }
        self.observed_long_lived_pod_ids.push(pod_id.to_string());
        true
    }
}

impl LongLivingPod {
    /// Resolves the CheckIn to observe as `(namespace, name)`.
    pub fn check_in_target(&self) -> (Option<String>, String) {
        match &self.spec.check_in_ref {
            Some(reference) => (
                reference
                    .namespace
                    .clone()
                    .or_else(|| self.metadata.namespace.clone()),
                reference.name.clone(),
            ),
            None => (self.metadata.namespace.clone(), DEFAULT_CHECK_IN_NAME.to_string()),
        }
    }
}
