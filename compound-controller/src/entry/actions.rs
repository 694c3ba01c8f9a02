//! Status helpers for the Entry reconciler, mirroring
//! `provider::actions`'s split between deciding and doing.

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::Resource;
use kube::runtime::events::{EventType, Recorder, Reporter};

use compound_model::status::{entry_severity, patch_status, record_event};
use compound_provider::ProviderKey;
use compound_types::{DNSEntry, DNSEntryStatus, EntryPhase};

use crate::context::ControllerContext;

/// Patches `entry`'s status to `phase` with `message`, leaving the
/// provider/zone/targets/ttl fields untouched (those are only ever
/// written by the zone ticker once a change is actually applied — spec
/// §4.5 "status is only updated once the change has been applied").
pub async fn report_phase(
    ctx: &ControllerContext,
    entry: &DNSEntry,
    phase: EntryPhase,
    message: impl Into<String>,
) -> Result<DNSEntry, compound_model::Error> {
    let message = message.into();
    let updated = patch_status::<DNSEntry, DNSEntryStatus>(&ctx.client, entry, Time(Utc::now()), |status| {
        status.state = phase;
        status.message = Some(message.clone());
        status.observed_generation = entry.metadata.generation;
    })
    .await?;

    let recorder = Recorder::new(
        ctx.client.clone(),
        Reporter { controller: "compound-controller".to_string(), instance: None },
        updated.object_ref(&()),
    );
    record_event(&recorder, entry_severity(phase), "StatusTransition", message).await;
    Ok(updated)
}

/// Emits a Warning event noting that more than one provider's domain
/// scope claimed this entry's name and the tie was broken deterministically
/// (spec §4.4 step 5 "ties are broken deterministically ... and the
/// tie-break is recorded as a warning event on the affected Entry").
pub async fn emit_tie_break_warning(ctx: &ControllerContext, entry: &DNSEntry, chosen: &ProviderKey, candidates: &[ProviderKey]) {
    let others: Vec<String> = candidates.iter().filter(|k| *k != chosen).map(ProviderKey::to_string).collect();
    let note = format!("dns name claimed by multiple providers, chose {chosen} over {}", others.join(", "));
    let recorder = Recorder::new(
        ctx.client.clone(),
        Reporter { controller: "compound-controller".to_string(), instance: None },
        entry.object_ref(&()),
    );
    record_event(&recorder, EventType::Warning, "ProviderTieBreak", note).await;
}
