//! Status diff/write-back (spec §4.3: "computes `status` diffs, writes
//! them via `update-status`, and emits a user-visible event for each
//! phase transition"). Generalizes the teacher storage-operator's single
//! `patch_status` helper to both declarative resources this controller
//! reconciles.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{
    Api, Client, Resource,
    api::{Patch, PatchParams},
    core::NamespaceResourceScope,
    runtime::events::{Event, EventType, Recorder},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use compound_types::{
    DNSEntry, DNSEntryStatus, DNSProvider, DNSProviderStatus, EntryPhase, ProviderPhase,
};

use crate::error::Error;

const MANAGER: &str = "compound-controller";

/// Bounded number of attempts [`patch_status`] makes before giving up on
/// repeated optimistic-concurrency conflicts (spec §4.1 "`modify` must
/// retry on conflict up to a bounded number of attempts").
const MAX_CONFLICT_ATTEMPTS: u32 = 5;

/// Implemented by a CRD type to expose its status subresource for the
/// generic `patch_status` below.
pub trait HasStatus<S> {
    fn take_status(&mut self) -> &mut S;
}

/// Implemented by a status type so `patch_status` can stamp a last-updated
/// timestamp without every caller doing it by hand.
pub trait Timestamped {
    fn set_last_updated(&mut self, ts: Time);
}

impl HasStatus<DNSProviderStatus> for DNSProvider {
    fn take_status(&mut self) -> &mut DNSProviderStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

impl Timestamped for DNSProviderStatus {
    fn set_last_updated(&mut self, ts: Time) {
        self.last_updated = Some(ts);
    }
}

impl HasStatus<DNSEntryStatus> for DNSEntry {
    fn take_status(&mut self) -> &mut DNSEntryStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

impl Timestamped for DNSEntryStatus {
    fn set_last_updated(&mut self, ts: Time) {
        self.last_updated = Some(ts);
    }
}

/// Patches `instance`'s status subresource with the mutation `f`, using a
/// JSON-merge diff against the live object so unrelated fields are left
/// untouched (same technique the teacher's `patch_status` uses, rebuilt
/// generic over status type instead of hard-coded to one CRD). Retries
/// from a fresh read on a 409 conflict up to [`MAX_CONFLICT_ATTEMPTS`]
/// times (spec §4.1 "`modify` must retry on conflict up to a bounded
/// number of attempts and surface the last conflict as a retryable
/// error"), so a concurrent status writer never silently loses this call's
/// update.
pub async fn patch_status<T, S>(
    client: &Client,
    instance: &T,
    now: Time,
    f: impl Fn(&mut S),
) -> Result<T, Error>
where
    T: Resource<Scope = NamespaceResourceScope>
        + Clone
        + HasStatus<S>
        + Serialize
        + DeserializeOwned
        + Debug,
    <T as Resource>::DynamicType: Default,
    S: Timestamped,
{
    let name = instance.meta().name.clone().unwrap_or_default();
    let namespace = instance.meta().namespace.clone().unwrap_or_default();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);

    let mut base = instance.clone();
    let mut last_err = None;
    for attempt in 1..=MAX_CONFLICT_ATTEMPTS {
        let mut modified = base.clone();
        {
            let status = modified.take_status();
            f(status);
            status.set_last_updated(now.clone());
        }
        let patch = Patch::Merge(serde_json::json!({ "status": status_value(&modified)? }));
        match api.patch_status(&name, &PatchParams::apply(MANAGER), &patch).await {
            Ok(updated) => return Ok(updated),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                tracing::debug!(name = %name, attempt, "status patch conflict, re-reading and retrying");
                last_err = Some(kube::Error::Api(ae));
                base = api.get(&name).await?;
            }
            Err(err) => return Err(Error::from(err)),
        }
    }
    Err(Error::from(
        last_err.expect("loop runs at least once and only falls through after a conflict"),
    ))
}

fn status_value<T: Serialize>(modified: &T) -> Result<serde_json::Value, Error> {
    let full = serde_json::to_value(modified)?;
    Ok(full
        .get("status")
        .cloned()
        .unwrap_or(serde_json::Value::Null))
}

/// Emits an event on the offending object for a phase transition (spec
/// §6 "Telemetry: ... one event stream attached to the Provider/Entry
/// objects"; spec §7 "every status transition emits an event ... with
/// severity Normal/Warning").
pub async fn record_event(
    recorder: &Recorder,
    severity: EventType,
    reason: &str,
    note: impl Into<String>,
) {
    let result = recorder
        .publish(
            &Event {
                type_: severity,
                reason: reason.to_string(),
                note: Some(note.into()),
                action: "Reconcile".to_string(),
                secondary: None,
            },
        )
        .await;
    if let Err(err) = result {
        tracing::warn!(error = %err, "failed to publish reconcile event");
    }
}

/// Maps a Provider/Entry phase to the event severity it should be
/// reported with.
pub fn provider_severity(phase: ProviderPhase) -> EventType {
    match phase {
        ProviderPhase::Error => EventType::Warning,
        _ => EventType::Normal,
    }
}

pub fn entry_severity(phase: EntryPhase) -> EventType {
    match phase {
        EntryPhase::Error | EntryPhase::Invalid | EntryPhase::Stale => EventType::Warning,
        _ => EventType::Normal,
    }
}
