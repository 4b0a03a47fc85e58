//! `kube::Api`-backed cluster store

use crate::error::StoreError;
use crate::store::{object_location, ClusterStore, StoreObject};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

/// Cluster store talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Creates a store over an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Api for watching `K` in `namespace`, or across all namespaces when `None`.
pub fn scoped_api<K: StoreObject>(client: Client, namespace: Option<&str>) -> Api<K> {
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Maps API status codes onto the store taxonomy.
fn classify<K: StoreObject>(err: kube::Error, namespace: &str, name: &str, on_write: bool) -> StoreError {
    let kind = K::kind(&()).to_string();
    match err {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 && !on_write => StoreError::AlreadyExists {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: ae.message,
        },
        other => StoreError::Kube(other),
    }
}

#[async_trait::async_trait]
impl ClusterStore for KubeStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        self.api::<K>(namespace)
            .get(name)
            .await
            .map_err(|e| classify::<K>(e, namespace, name, false))
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_location(obj);
        debug!(kind = %K::kind(&()), %namespace, %name, "Creating object");
        self.api::<K>(&namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| classify::<K>(e, &namespace, &name, false))
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_location(obj);
        debug!(kind = %K::kind(&()), %namespace, %name, "Replacing object");
        self.api::<K>(&namespace)
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|e| classify::<K>(e, &namespace, &name, true))
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_location(obj);
        let value = serde_json::to_value(obj)?;

        // resourceVersion in the merge patch makes the API server reject stale writes
        let status_patch = serde_json::json!({
            "metadata": {
                "resourceVersion": obj.meta().resource_version,
            },
            "status": value.get("status").cloned().unwrap_or(serde_json::Value::Null),
        });

        debug!(kind = %K::kind(&()), %namespace, %name, "Patching status");
        self.api::<K>(&namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await
            .map_err(|e| classify::<K>(e, &namespace, &name, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        let response = serde_json::from_value(serde_json::json!({
            "status": "Failure",
            "message": format!("configmaps \"web-config\" {reason}"),
            "reason": reason,
            "code": code,
        }))
        .unwrap();
        kube::Error::Api(response)
    }

    #[test]
    fn test_not_found_on_read_and_write() {
        for on_write in [false, true] {
            let err = classify::<ConfigMap>(api_error(404, "NotFound"), "default", "web-config", on_write);
            assert!(matches!(
                err,
                StoreError::NotFound { ref kind, ref namespace, ref name }
                    if kind == "ConfigMap" && namespace == "default" && name == "web-config"
            ));
        }
    }

    #[test]
    fn test_conflict_on_create_means_already_exists() {
        let err = classify::<ConfigMap>(api_error(409, "AlreadyExists"), "default", "web-config", false);
        assert!(matches!(err, StoreError::AlreadyExists { ref name, .. } if name == "web-config"));
    }

    #[test]
    fn test_conflict_on_write_keeps_server_message() {
        let err = classify::<ConfigMap>(api_error(409, "Conflict"), "default", "web-config", true);
        assert!(matches!(
            err,
            StoreError::Conflict { ref message, .. } if message == "configmaps \"web-config\" Conflict"
        ));
    }

    #[test]
    fn test_other_statuses_pass_through() {
        let err = classify::<ConfigMap>(api_error(500, "InternalError"), "default", "web-config", true);
        assert!(matches!(err, StoreError::Kube(kube::Error::Api(ref ae)) if ae.code == 500));
        assert!(!err.is_not_found());
    }
}
