//! Mock ClusterStore for unit testing
//!
//! This module provides an in-memory implementation of [`ClusterStore`] that
//! can be used in unit tests without a running API server. It mimics the
//! parts of API server behaviour the reconcilers depend on:
//!
//! - `create` assigns a UID and resourceVersion and rejects duplicates
//! - `update` keeps the stored status, `update_status` writes only status
//! - writes carrying a stale resourceVersion fail with a conflict
//!
//! Every call is recorded so tests can assert on exactly which writes a
//! reconciliation performed.

use crate::error::StoreError;
use crate::store::{object_location, ClusterStore, StoreObject};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Read one object
    Get,
    /// Create an object
    Create,
    /// Replace an object
    Update,
    /// Write the status subresource
    UpdateStatus,
}

/// A recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
struct Operation {
    verb: Verb,
    kind: String,
}

type ObjectId = (String, String, String);

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<ObjectId, Value>,
    operations: Vec<Operation>,
    failures: Vec<(Verb, String)>,
    resource_version: u64,
}

impl MockState {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn record(&mut self, verb: Verb, kind: &str, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.operations.push(Operation {
            verb,
            kind: kind.to_string(),
        });
        if let Some(pos) = self.failures.iter().position(|(v, k)| *v == verb && k == kind) {
            self.failures.remove(pos);
            return Err(StoreError::Unavailable(format!(
                "injected {verb:?} failure for {kind} {namespace}/{name}"
            )));
        }
        Ok(())
    }
}

/// In-memory [`ClusterStore`].
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MockClusterStore {
    state: Arc<Mutex<MockState>>,
}

fn object_id<K: StoreObject>(namespace: &str, name: &str) -> ObjectId {
    (
        format!("{}/{}", K::api_version(&()), K::kind(&())),
        namespace.to_string(),
        name.to_string(),
    )
}

fn stored_resource_version(value: &Value) -> Option<&str> {
    value.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

impl MockClusterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an object as-is, status included (for test setup).
    ///
    /// A UID is assigned if missing; the resourceVersion is always assigned.
    pub fn insert<K: StoreObject>(&self, mut obj: K) -> K {
        let mut state = self.state();
        let (namespace, name) = object_location(&obj);
        let meta = obj.meta_mut();
        if meta.uid.is_none() {
            meta.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        meta.resource_version = Some(state.next_resource_version());
        if let Ok(value) = serde_json::to_value(&obj) {
            state.objects.insert(object_id::<K>(&namespace, &name), value);
        }
        obj
    }

    /// Reads an object without recording an operation.
    pub fn stored<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        self.state()
            .objects
            .get(&object_id::<K>(namespace, name))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Removes an object, as an external actor or garbage collection would.
    pub fn remove<K: StoreObject>(&self, namespace: &str, name: &str) -> bool {
        self.state()
            .objects
            .remove(&object_id::<K>(namespace, name))
            .is_some()
    }

    /// All stored objects of one kind in a namespace.
    pub fn list<K: StoreObject>(&self, namespace: &str) -> Vec<K> {
        let (kind_key, _, _) = object_id::<K>(namespace, "");
        self.state()
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind_key && ns == namespace)
            .filter_map(|(_, value)| serde_json::from_value(value.clone()).ok())
            .collect()
    }

    /// Number of recorded calls matching `verb` and `kind`.
    pub fn count(&self, verb: Verb, kind: &str) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| op.verb == verb && op.kind == kind)
            .count()
    }

    /// Number of recorded writes (anything but `Get`).
    pub fn write_count(&self) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| op.verb != Verb::Get)
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Makes the next `verb` call on `kind` fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, verb: Verb, kind: &str) {
        self.state().failures.push((verb, kind.to_string()));
    }

    fn check_resource_version<K: StoreObject>(
        obj: &K,
        stored: &Value,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        match (&obj.meta().resource_version, stored_resource_version(stored)) {
            (Some(incoming), Some(current)) if incoming != current => Err(StoreError::Conflict {
                kind: K::kind(&()).to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: format!("resourceVersion {incoming} is stale, current is {current}"),
            }),
            _ => Ok(()),
        }
    }

    fn not_found<K: StoreObject>(namespace: &str, name: &str) -> StoreError {
        StoreError::NotFound {
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ClusterStore for MockClusterStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        let mut state = self.state();
        state.record(Verb::Get, &K::kind(&()), namespace, name)?;
        match state.objects.get(&object_id::<K>(namespace, name)) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(Self::not_found::<K>(namespace, name)),
        }
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_location(obj);
        let mut state = self.state();
        state.record(Verb::Create, &K::kind(&()), &namespace, &name)?;

        let id = object_id::<K>(&namespace, &name);
        if state.objects.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                kind: K::kind(&()).to_string(),
                namespace,
                name,
            });
        }

        let mut created = obj.clone();
        let resource_version = state.next_resource_version();
        let meta = created.meta_mut();
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        meta.resource_version = Some(resource_version);

        state.objects.insert(id, serde_json::to_value(&created)?);
        Ok(created)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_location(obj);
        let mut state = self.state();
        state.record(Verb::Update, &K::kind(&()), &namespace, &name)?;

        let id = object_id::<K>(&namespace, &name);
        let stored = state
            .objects
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found::<K>(&namespace, &name))?;
        Self::check_resource_version(obj, &stored, &namespace, &name)?;

        let mut value = serde_json::to_value(obj)?;
        let resource_version = state.next_resource_version();
        if let Some(map) = value.as_object_mut() {
            match stored.get("status") {
                Some(status) => map.insert("status".to_string(), status.clone()),
                None => map.remove("status"),
            };
        }
        if let Some(meta) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            if let Some(uid) = stored.pointer("/metadata/uid") {
                meta.insert("uid".to_string(), uid.clone());
            }
            meta.insert("resourceVersion".to_string(), Value::String(resource_version));
        }

        state.objects.insert(id, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_location(obj);
        let mut state = self.state();
        state.record(Verb::UpdateStatus, &K::kind(&()), &namespace, &name)?;

        let id = object_id::<K>(&namespace, &name);
        let mut stored = state
            .objects
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found::<K>(&namespace, &name))?;
        Self::check_resource_version(obj, &stored, &namespace, &name)?;

        let incoming = serde_json::to_value(obj)?;
        let resource_version = state.next_resource_version();
        if let Some(map) = stored.as_object_mut() {
            match incoming.get("status") {
                Some(status) => map.insert("status".to_string(), status.clone()),
                None => map.remove("status"),
            };
        }
        if let Some(meta) = stored.get_mut("metadata").and_then(Value::as_object_mut) {
            meta.insert("resourceVersion".to_string(), Value::String(resource_version));
        }

        state.objects.insert(id, stored.clone());
        Ok(serde_json::from_value(stored)?)
    }
}
