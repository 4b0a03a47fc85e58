//! Test utilities for unit testing reconcilers
//!
//! Helpers for building test objects and a reconcile context backed by
//! [`MockClusterStore`].

use crate::config::TrackerSettings;
use crate::reconciler::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use controller_kit::MockClusterStore;
use crds::{CheckIn, CheckInRef, CheckInSpec, CheckInStatus, LongLivingPod, LongLivingPodSpec};
use k8s_openapi::api::core::v1::Pod;
use serde_json::json;
use std::sync::Arc;

pub const TEST_NAMESPACE: &str = "default";

/// Fixed instant used as "now" by tracker tests.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Context over `store` with default tracker settings.
pub fn test_context(store: &MockClusterStore) -> Arc<Context<MockClusterStore>> {
    Arc::new(Context::new(store.clone(), TrackerSettings::default()))
}

/// Helper to create a test CheckIn without status
pub fn create_test_check_in(name: &str, image: &str) -> CheckIn {
    let mut check_in = CheckIn::new(name, CheckInSpec { pod_image: image.to_string() });
    check_in.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    check_in
}

/// Helper to create a test CheckIn whose active Pod is `pod_uid`
pub fn create_test_check_in_with_active_pod(name: &str, pod_uid: &str) -> CheckIn {
    let mut check_in = create_test_check_in(name, "nginx");
    check_in.status = Some(CheckInStatus {
        active_pod_id: pod_uid.to_string(),
        pod_history: vec![pod_uid.to_string()],
        conditions: Vec::new(),
    });
    check_in
}

/// Helper to create a test LongLivingPod, optionally pointing at a CheckIn
pub fn create_test_long_living_pod(name: &str, check_in_ref: Option<CheckInRef>) -> LongLivingPod {
    let mut tracker = LongLivingPod::new(name, LongLivingPodSpec { check_in_ref });
    tracker.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    tracker
}

/// Helper to create a Pod with a fixed UID that started `running_for` before [`test_now`]
pub fn create_test_running_pod(name: &str, uid: &str, running_for: Duration) -> Pod {
    let started = test_now() - running_for;
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": TEST_NAMESPACE,
            "uid": uid,
        },
        "spec": {
            "containers": [{ "name": "checkin-container", "image": "nginx" }],
        },
        "status": {
            "phase": "Running",
            "startTime": started.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        },
    }))
    .unwrap()
}

/// Helper to create a Pod that has not been scheduled yet
pub fn create_test_pending_pod(name: &str, uid: &str) -> Pod {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": name, "namespace": TEST_NAMESPACE, "uid": uid },
        "spec": { "containers": [{ "name": "checkin-container", "image": "nginx" }] },
        "status": { "phase": "Pending" },
    }))
    .unwrap()
}
