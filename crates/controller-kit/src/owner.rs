//! Owner references
//!
//! Managed objects point at their controlling custom resource so the
//! garbage collector removes them when the owner is deleted.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

/// Builds the controller owner reference for `owner`.
///
/// Returns `None` when the owner has no name or UID yet (it was never
/// persisted), in which case no valid relationship can be expressed.
pub fn controller_reference<O>(owner: &O) -> Option<OwnerReference>
where
    O: Resource<DynamicType = ()>,
{
    owner.controller_owner_ref(&())
}

/// Replaces any existing controller reference on `obj` with `reference`.
pub fn set_controller_reference<K: Resource>(obj: &mut K, reference: OwnerReference) {
    let refs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.controller != Some(true));
    refs.push(reference);
}

/// The controller reference of `obj`, if it has one.
pub fn controller_of<K: Resource>(obj: &K) -> Option<&OwnerReference> {
    obj.meta()
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// Returns `true` if `obj` is controlled by the object with `owner_uid`.
pub fn is_controlled_by<K: Resource>(obj: &K, owner_uid: &str) -> bool {
    controller_of(obj).is_some_and(|r| r.uid == owner_uid)
}
