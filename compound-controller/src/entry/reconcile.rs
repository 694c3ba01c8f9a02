//! Entry reconciler (spec §4.3 "Entry Reconciler"). Validates the spec,
//! resolves the owning provider/zone via the selection index, and
//! contributes the entry's compiled records into that zone's registry.
//! Never writes to a backend directly — the zone ticker owns every
//! backend call (spec §4.5 "applying the diff is the zone reconciler's
//! job alone").

use std::sync::Arc;
use std::time::Duration;

use kube::{Resource, ResourceExt, runtime::controller::Action};

use compound_common::FINALIZER;
use compound_model::validate::validate_entry;
use compound_types::{DNSEntry, EntryPhase};
use compound_zone::ZoneKey;

use crate::context::ControllerContext;
use crate::error::Error;
use crate::zone::registry::EntryRef;

use super::{actions, compile};

const DEFAULT_REQUEUE: Duration = Duration::from_secs(30);

/// Reconciles one `DNSEntry`, timing the call and recording its outcome
/// under `ControllerMetrics` when the `metrics` feature is enabled (spec
/// §6 "Telemetry: reconcile_total, reconcile_errors_total,
/// reconcile_duration_seconds ... labeled by cluster/kind/reconciler").
pub async fn reconcile(entry: Arc<DNSEntry>, ctx: Arc<ControllerContext>) -> Result<Action, Error> {
    #[cfg(feature = "metrics")]
    {
        let start = std::time::Instant::now();
        let metrics_ctx = ctx.clone();
        let result = reconcile_inner(entry, ctx).await;
        let labels = [metrics_ctx.cluster.as_str(), "DNSEntry", "entry"];
        metrics_ctx.metrics.reconcile_total.with_label_values(&labels).inc();
        metrics_ctx
            .metrics
            .reconcile_duration_seconds
            .with_label_values(&labels)
            .observe(start.elapsed().as_secs_f64());
        if result.is_err() {
            metrics_ctx.metrics.reconcile_errors_total.with_label_values(&labels).inc();
        }
        result
    }
    #[cfg(not(feature = "metrics"))]
    {
        reconcile_inner(entry, ctx).await
    }
}

async fn reconcile_inner(entry: Arc<DNSEntry>, ctx: Arc<ControllerContext>) -> Result<Action, Error> {
    let namespace = entry.namespace().ok_or_else(|| Error::MissingNamespace(entry.name_any()))?;
    let entry_ref = EntryRef::new(namespace, entry.name_any());

    if entry.meta().deletion_timestamp.is_some() {
        return handle_deletion(&entry, &entry_ref, &ctx).await;
    }

    if let Err(err) = validate_entry(&entry.spec) {
        actions::report_phase(&ctx, &entry, EntryPhase::Invalid, err.to_string()).await?;
        return Ok(Action::await_change());
    }

    let snapshot = ctx.provider_registry.snapshot();
    let resolution = snapshot.resolve(&entry.spec.dns_name);
    let candidates = resolution.ordered_candidates();
    if resolution.was_tied()
        && let Some(chosen) = resolution.chosen()
    {
        actions::emit_tie_break_warning(&ctx, &entry, chosen, &candidates).await;
    }

    let mut accepted = None;
    for candidate in candidates {
        let Some(record) = snapshot.get(&candidate) else { continue };
        let Some(handler) = ctx.backends.lock().get(&candidate.to_string()) else { continue };
        let zone_id = match handler.probe_zone_for_name(&entry.spec.dns_name).await {
            Ok(Some(zone_id)) if record.zones.admits_zone(&zone_id) => zone_id,
            _ => continue,
        };
        accepted = Some((candidate, record.clone(), zone_id));
        break;
    }

    let Some((provider_key, provider_record, zone_id)) = accepted else {
        retract_from_previous(&entry, &entry_ref, &ctx).await;
        actions::report_phase(
            &ctx,
            &entry,
            EntryPhase::Error,
            format!("no matching provider for dns name {:?}", entry.spec.dns_name),
        )
        .await?;
        return Ok(Action::requeue(DEFAULT_REQUEUE));
    };

    compound_model::finalizer::add(&ctx.client, entry.as_ref(), FINALIZER).await?;

    let previous = entry
        .status
        .as_ref()
        .and_then(|s| Some((s.provider.clone()?, s.zone.clone()?)));
    let current = (provider_key.to_string(), zone_id.clone());
    if previous.as_ref().is_some_and(|p| p != &current) {
        retract_from_previous(&entry, &entry_ref, &ctx).await;
    }

    let zone_key = ZoneKey {
        provider_namespace: provider_key.namespace.clone(),
        provider_name: provider_key.name.clone(),
        zone_id: zone_id.clone(),
    };
    let zone = ctx.zones.get_or_insert(zone_key, provider_key.to_string());
    {
        let mut zone = zone.lock().await;
        zone.domain_include = provider_record.domains.include.clone();
        zone.domain_exclude = provider_record.domains.exclude.clone();
        for (key, value) in compile::compile(&entry.spec, provider_record.default_ttl) {
            zone.contribute(key, entry_ref.clone(), value);
        }
    }

    actions::report_phase(&ctx, &entry, EntryPhase::Pending, "awaiting zone apply").await?;
    Ok(Action::requeue(DEFAULT_REQUEUE))
}

async fn handle_deletion(entry: &DNSEntry, entry_ref: &EntryRef, ctx: &Arc<ControllerContext>) -> Result<Action, Error> {
    if !entry.finalizers().iter().any(|f| f == FINALIZER) {
        return Ok(Action::await_change());
    }
    ctx.shutdown.record_deletion_activity(chrono::Utc::now().timestamp());
    retract_from_previous(entry, entry_ref, ctx).await;
    Ok(Action::requeue(Duration::from_secs(5)))
}

/// Retracts `entry`'s contributions from the zone named in its own
/// status, moving the affected keys into that zone's pending-deletion
/// set so the ticker can confirm the records are actually gone from the
/// backend before the finalizer is removed (spec §4.5 "only once the
/// delete is observed").
async fn retract_from_previous(entry: &DNSEntry, entry_ref: &EntryRef, ctx: &Arc<ControllerContext>) {
    let Some(status) = entry.status.as_ref() else { return };
    let (Some(provider), Some(zone_id)) = (status.provider.clone(), status.zone.clone()) else { return };
    let Some((provider_namespace, provider_name)) = provider.split_once('/') else { return };
    let zone_key = ZoneKey {
        provider_namespace: provider_namespace.to_string(),
        provider_name: provider_name.to_string(),
        zone_id,
    };
    let Some(zone) = ctx.zones.get(&zone_key) else { return };
    let mut zone = zone.lock().await;
    let touched = zone.retract_entry(entry_ref);
    if !touched.is_empty() {
        zone.pending_deletions.insert(entry_ref.clone(), touched);
    }
}

pub fn on_error(_entry: Arc<DNSEntry>, error: &Error, _ctx: Arc<ControllerContext>) -> Action {
    tracing::warn!(error = %error, "entry reconcile failed");
    Action::requeue(Duration::from_secs(5))
}
