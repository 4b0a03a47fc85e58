//! CheckIn CRD
//!
//! Requests a single managed Pod running the given image. The controller
//! records every Pod identity it has observed for the CheckIn.

use crate::conditions::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type set once the managed Pod has been recorded
pub const CHECK_IN_COMPLETED: &str = "Completed";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "tracker.meng.xu",
    version = "v1alpha1",
    kind = "CheckIn",
    namespaced,
    status = "CheckInStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSpec {
    /// Container image for the managed Pod
    pub pod_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInStatus {
    /// UID of the Pod currently managed for this CheckIn
    #[serde(default, rename = "activePodID", skip_serializing_if = "String::is_empty")]
    pub active_pod_id: String,

    /// Every Pod UID ever recorded, in the order observed (append-only)
    #[serde(default)]
    pub pod_history: Vec<String>,

    /// Latest observations, keyed by condition type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Deterministic name of the Pod managed for a CheckIn.
pub fn managed_pod_name(check_in_name: &str) -> String {
    format!("{check_in_name}-pod")
}
