//! Atomic finalizer add/remove (spec §4.3: "exposes a helper that
//! atomically adds or removes the controller's finalizer"; spec §3
//! invariant: "the set of finalizers attached by the controller is
//! bounded: one per controller identity; never duplicated"). Every write
//! goes through `compound_cluster::modify` (spec §4.1 "modify(key, fn) —
//! read-modify-write with retry on optimistic-concurrency failures")
//! instead of patching the caller's possibly-stale cached copy, so a
//! concurrent writer's finalizer is never clobbered by a conflicting
//! write racing it.

use kube::{Api, Client, Resource, ResourceExt, core::NamespaceResourceScope};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use compound_common::annotations;

/// Adds `finalizer` if the cached `obj` doesn't already carry it, and
/// keeps [`annotations::SPEC_HASH`]/[`annotations::CREATED_BY`] current
/// while it's at it — this is the one place every reconciler already
/// routes ownership-taking writes through, so it's also where the
/// adoption bookkeeping belongs. No-op (and no API call) once both the
/// finalizer is present and the spec hash already matches, satisfying
/// the "never duplicated" invariant without relying on server-side merge
/// semantics alone.
pub async fn add<T>(client: &Client, obj: &T, finalizer: &str) -> Result<(), compound_cluster::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static,
    <T as Resource>::DynamicType: Default,
{
    let already_finalized = obj.finalizers().iter().any(|f| f == finalizer);
    let current_hash = annotations::spec_hash(obj);
    let hash_current = obj.annotations().get(annotations::SPEC_HASH).is_some_and(|h| h == &current_hash);
    if already_finalized && hash_current {
        return Ok(());
    }
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let finalizer = finalizer.to_string();
    compound_cluster::modify(&api, &name, move |current: &mut T| {
        if !current.finalizers().iter().any(|f| f == &finalizer) {
            current.finalizers_mut().push(finalizer.clone());
        }
        let hash = annotations::spec_hash(current);
        current.annotations_mut().insert(annotations::SPEC_HASH.to_string(), hash);
        current
            .annotations_mut()
            .entry(annotations::CREATED_BY.to_string())
            .or_insert_with(|| annotations::CONTROLLER_IDENTITY.to_string());
    })
    .await?;
    Ok(())
}

/// Removes `finalizer` if the cached `obj` carries it. No-op otherwise.
pub async fn remove<T>(client: &Client, obj: &T, finalizer: &str) -> Result<(), compound_cluster::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static,
    <T as Resource>::DynamicType: Default,
{
    if !obj.finalizers().iter().any(|f| f == finalizer) {
        return Ok(());
    }
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let finalizer = finalizer.to_string();
    compound_cluster::modify(&api, &name, move |current: &mut T| {
        current.finalizers_mut().retain(|f| f != &finalizer);
    })
    .await?;
    Ok(())
}
