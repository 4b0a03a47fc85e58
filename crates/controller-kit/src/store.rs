//! ClusterStore trait for mocking
//!
//! This trait abstracts typed access to cluster objects so reconcilers can
//! be unit tested against an in-memory store. [`KubeStore`](crate::KubeStore)
//! implements it over `kube::Api`; tests use `MockClusterStore`.

use crate::error::StoreError;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Any namespaced, typed resource the store can read and write.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Cluster state store operations used by the reconcilers.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Every object carries its owner references and resourceVersion; writes
/// based on a stale resourceVersion fail with [`StoreError::Conflict`].
#[async_trait::async_trait]
pub trait ClusterStore: Send + Sync + 'static {
    /// Fetches an object, failing with [`StoreError::NotFound`] if absent.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError>;

    /// Creates an object, failing with [`StoreError::AlreadyExists`] on a name collision.
    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Replaces an object's metadata and spec. Status is not written.
    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Writes only the status subresource.
    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Fetches an object, mapping absence to `None`.
    async fn get_opt<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        match self.get::<K>(namespace, name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Namespace and name of an object as `(namespace, name)`, for error reporting.
pub(crate) fn object_location<K: Resource>(obj: &K) -> (String, String) {
    let meta = obj.meta();
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}
