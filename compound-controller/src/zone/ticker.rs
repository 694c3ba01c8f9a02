//! The Zone Reconciler's periodic apply loop (spec §4.5): refreshes each
//! owned zone's observed record set, recomputes the pending diff,
//! submits a single batch per zone per tick, and writes the outcome back
//! onto every contributing Entry's status. Runs as one task iterating
//! every zone this process owns rather than one task per zone — per-zone
//! exclusivity is provided by each zone's own `tokio::sync::Mutex`, not
//! by task affinity (spec §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::Resource;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::runtime::reflector::ObjectRef;
use tokio_util::sync::CancellationToken;

use compound_backend::{ChangeOutcome, ChangeSet, RecordKey};
use compound_common::FINALIZER;
use compound_model::status::{entry_severity, patch_status, record_event};
use compound_types::{DNSEntry, DNSEntryStatus, EntryPhase};
use compound_zone::ZoneKey;

use crate::context::ControllerContext;
use crate::zone::registry::{Contribution, EntryRef};

/// While a zone is degraded (spec §4.5, backed by
/// [`compound_zone::OwnedZoneState::is_degraded`]), only every Nth tick
/// actually submits a batch to the backend; the rest keep refreshing the
/// observed set and leave `pending` queued, down-sampling the effective
/// reconcile rate against a backend that is already struggling.
const DEGRADED_SKIP_FACTOR: u32 = 3;

/// Drives the periodic apply tick for as long as `shutdown` is not
/// cancelled. `tick_interval` doubles as the observed-record refresh
/// interval (spec §4.5 "refreshed on a configurable interval and after
/// each apply").
pub async fn run(ctx: Arc<ControllerContext>, tick_interval: Duration, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(tick_interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }
        let zone_keys = ctx.zones.keys();
        #[cfg(feature = "metrics")]
        ctx.metrics
            .queue_depth
            .with_label_values(&[ctx.cluster.as_str(), "zone"])
            .set(zone_keys.len() as i64);
        for zone_key in zone_keys {
            if let Err(err) = apply_zone(&ctx, &zone_key).await {
                tracing::warn!(zone = %zone_key.zone_id, error = %err, "zone apply tick failed");
            }
            ctx.zones.remove_if_empty(&zone_key);
        }
    }
}

async fn apply_zone(ctx: &Arc<ControllerContext>, zone_key: &ZoneKey) -> Result<(), crate::error::Error> {
    let Some(zone) = ctx.zones.get(zone_key) else {
        return Ok(());
    };
    let mut record = zone.lock().await;

    let Some(handler) = ctx.backends.lock().get(&record.provider_key) else {
        return Ok(());
    };

    let now = Utc::now().timestamp();
    if let Some(last) = record.state.last_apply_at
        && (now - last) < record.state.rate_limiter.delay().as_secs() as i64
    {
        return Ok(());
    }

    #[cfg(feature = "metrics")]
    let provider_type_label = ctx
        .backends
        .lock()
        .provider_type(&record.provider_key)
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let observed = handler.list_records(&zone_key.zone_id).await;
    #[cfg(feature = "metrics")]
    ctx.metrics
        .backend_calls_total
        .with_label_values(&[&provider_type_label, "list_records", if observed.is_ok() { "ok" } else { "err" }])
        .inc();
    let observed = observed?;
    record.state.observed = observed.into_iter().map(|r| (r.key.clone(), r)).collect();

    let include = record.domain_include.clone();
    let exclude = record.domain_exclude.clone();
    record.state.recompute_pending(|key| in_scope(&include, &exclude, key));

    if record.state.pending.is_empty() {
        record.state.record_apply(now, true, None);
        let finalized = record.finalize_observed_deletions();
        drop(record);
        for entry in finalized {
            remove_entry_finalizer(ctx, &entry).await;
        }
        return Ok(());
    }

    if record.state.is_degraded() {
        record.degraded_skip_counter += 1;
        let newly_degraded = !record.degraded_event_emitted;
        record.degraded_event_emitted = true;
        if record.degraded_skip_counter % DEGRADED_SKIP_FACTOR != 0 {
            let provider_namespace = zone_key.provider_namespace.clone();
            let provider_name = zone_key.provider_name.clone();
            let zone_id = zone_key.zone_id.clone();
            drop(record);
            if newly_degraded {
                emit_degraded_event(ctx, &provider_namespace, &provider_name, &zone_id).await;
            }
            return Ok(());
        }
    } else {
        record.degraded_skip_counter = 0;
        record.degraded_event_emitted = false;
    }

    let batch = ChangeSet { ops: std::mem::take(&mut record.state.pending) };
    #[cfg(feature = "metrics")]
    let apply_start = std::time::Instant::now();
    let apply_result = handler.apply_change_set(&zone_key.zone_id, &batch).await;
    #[cfg(feature = "metrics")]
    {
        ctx.metrics
            .backend_calls_total
            .with_label_values(&[&provider_type_label, "apply_change_set", if apply_result.is_ok() { "ok" } else { "err" }])
            .inc();
        ctx.metrics
            .backend_apply_duration_seconds
            .with_label_values(&[&provider_type_label])
            .observe(apply_start.elapsed().as_secs_f64());
    }
    let outcomes = match apply_result {
        Ok(outcomes) => outcomes,
        Err(err) => {
            record.state.pending = batch.ops;
            record.state.record_apply(now, false, Some(err.to_string()));
            return Err(crate::error::Error::Backend(err));
        }
    };

    let mut all_ok = true;
    let mut retry = Vec::new();
    for outcome in &outcomes {
        let op = &batch.ops[outcome.index];
        match &outcome.result {
            Ok(()) => {
                apply_success(&mut record, op);
                if let Some(contribs) = record.contributors.get(op.key()).cloned() {
                    for c in contribs {
                        record.last_success_at.insert(c.entry, now);
                    }
                }
            }
            Err(err) => {
                all_ok = false;
                if !err.is_permanent() {
                    retry.push(op.clone());
                }
            }
        }
    }
    record.state.pending.extend(retry);
    record.state.record_apply(
        now,
        all_ok,
        if all_ok { None } else { Some("one or more changes failed".to_string()) },
    );

    let flap_suppressed = flap_suppression_map(&record, &batch, &outcomes, now, ctx.flap_suppression.as_secs() as i64);
    let contributors = record.contributors.clone();
    let finalized = record.finalize_observed_deletions();
    let provider_namespace = zone_key.provider_namespace.clone();
    let provider_name = zone_key.provider_name.clone();
    drop(record);

    let provider_type = ctx
        .backends
        .lock()
        .provider_type(&format!("{provider_namespace}/{provider_name}"));
    report_status(ctx, zone_key, provider_type, &outcomes, &batch, &contributors, &flap_suppressed).await;
    for entry in finalized {
        remove_entry_finalizer(ctx, &entry).await;
    }

    Ok(())
}

/// Per-key decision of whether a failed outcome should be suppressed
/// (left as the entry's existing Ready status) rather than written as
/// `Error`, because every Entry contributing to that key has succeeded
/// more recently than `threshold_secs` ago (spec §4.5 flap prevention).
/// A key with no prior success, or whose contributors never succeeded,
/// is never suppressed.
fn flap_suppression_map(
    record: &crate::zone::registry::ZoneRecord,
    batch: &ChangeSet,
    outcomes: &[ChangeOutcome],
    now: i64,
    threshold_secs: i64,
) -> HashMap<RecordKey, bool> {
    let mut suppressed = HashMap::new();
    for outcome in outcomes {
        if outcome.result.is_ok() {
            continue;
        }
        let op = &batch.ops[outcome.index];
        let Some(contribs) = record.contributors.get(op.key()) else { continue };
        let suppress = !contribs.is_empty()
            && contribs.iter().all(|c| {
                record
                    .last_success_at
                    .get(&c.entry)
                    .is_some_and(|last| now - last < threshold_secs)
            });
        suppressed.insert(op.key().clone(), suppress);
    }
    suppressed
}

async fn emit_degraded_event(ctx: &Arc<ControllerContext>, provider_namespace: &str, provider_name: &str, zone_id: &str) {
    let obj_ref = ObjectRef::<compound_types::DNSProvider>::new(provider_name).within(provider_namespace);
    let Some(provider) = ctx.providers.get(&obj_ref) else { return };
    let recorder = Recorder::new(
        ctx.client.clone(),
        Reporter { controller: "compound-controller".to_string(), instance: None },
        provider.object_ref(&()),
    );
    record_event(
        &recorder,
        EventType::Warning,
        "ZoneDegraded",
        format!("zone {zone_id} is degraded, down-sampling apply rate"),
    )
    .await;
}

fn in_scope(include: &[String], exclude: &[String], key: &RecordKey) -> bool {
    if exclude.iter().any(|s| suffix_matches(&key.name, s)) {
        return false;
    }
    include.is_empty() || include.iter().any(|s| suffix_matches(&key.name, s))
}

fn suffix_matches(name: &str, suffix: &str) -> bool {
    let suffix = compound_model::dns_name::normalize(suffix);
    name == suffix || name.ends_with(&format!(".{suffix}"))
}

fn apply_success(record: &mut crate::zone::registry::ZoneRecord, op: &compound_backend::ChangeOp) {
    use compound_backend::ChangeOp;
    match op {
        ChangeOp::Create(r) | ChangeOp::Update { to: r, .. } => {
            record.state.observed.insert(r.key.clone(), r.clone());
        }
        ChangeOp::Delete(r) => {
            record.state.observed.remove(&r.key);
        }
    }
}

async fn report_status(
    ctx: &Arc<ControllerContext>,
    zone_key: &ZoneKey,
    provider_type: Option<compound_types::ProviderType>,
    outcomes: &[ChangeOutcome],
    batch: &ChangeSet,
    contributors: &HashMap<RecordKey, Vec<Contribution>>,
    flap_suppressed: &HashMap<RecordKey, bool>,
) {
    for outcome in outcomes {
        let op = &batch.ops[outcome.index];
        let Some(contribs) = contributors.get(op.key()) else { continue };
        if outcome.result.is_err() && flap_suppressed.get(op.key()).copied().unwrap_or(false) {
            tracing::debug!(key = %op.key().name, "suppressing transient backend error, status left untouched");
            continue;
        }
        for contribution in contribs {
            report_entry_outcome(ctx, zone_key, provider_type, contribution, &outcome.result).await;
        }
    }
}

async fn report_entry_outcome(
    ctx: &Arc<ControllerContext>,
    zone_key: &ZoneKey,
    provider_type: Option<compound_types::ProviderType>,
    contribution: &Contribution,
    result: &Result<(), compound_backend::ApplyError>,
) {
    let obj_ref = ObjectRef::<DNSEntry>::new(&contribution.entry.name).within(&contribution.entry.namespace);
    let Some(entry) = ctx.entries.get(&obj_ref) else { return };
    let generation = entry.metadata.generation;

    let patched = patch_status::<DNSEntry, DNSEntryStatus>(&ctx.client, entry.as_ref(), Time(Utc::now()), |status| {
        match result {
            Ok(()) => {
                status.state = EntryPhase::Ready;
                status.message = Some("dns entry active".to_string());
                status.provider = Some(format!("{}/{}", zone_key.provider_namespace, zone_key.provider_name));
                status.provider_type = provider_type;
                status.zone = Some(zone_key.zone_id.clone());
                status.targets = contribution.value.values.iter().cloned().collect();
                status.ttl = Some(contribution.value.ttl);
                status.routing_policy = contribution.value.routing_policy.clone();
                status.observed_generation = generation;
            }
            Err(err) => {
                status.state = EntryPhase::Error;
                status.message = Some(err.to_string());
            }
        }
    })
    .await;

    let updated = match patched {
        Ok(updated) => updated,
        Err(err) => {
            tracing::warn!(entry = %contribution.entry.name, error = %err, "failed to patch entry status after zone apply");
            return;
        }
    };

    let recorder = Recorder::new(
        ctx.client.clone(),
        Reporter { controller: "compound-controller".to_string(), instance: None },
        updated.object_ref(&()),
    );
    let note = updated.status.as_ref().and_then(|s| s.message.clone()).unwrap_or_default();
    record_event(&recorder, entry_severity(updated.status.as_ref().map(|s| s.state).unwrap_or(EntryPhase::Pending)), "StatusTransition", note).await;
}

async fn remove_entry_finalizer(ctx: &Arc<ControllerContext>, entry_ref: &EntryRef) {
    let obj_ref = ObjectRef::<DNSEntry>::new(&entry_ref.name).within(&entry_ref.namespace);
    let Some(entry) = ctx.entries.get(&obj_ref) else { return };
    ctx.shutdown.record_deletion_activity(Utc::now().timestamp());
    if let Err(err) = compound_model::finalizer::remove(&ctx.client, entry.as_ref(), FINALIZER).await {
        tracing::warn!(entry = %entry_ref.name, error = %err, "failed to remove entry finalizer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::registry::ZoneRegistry;
    use compound_backend::{ApplyError, ChangeOp, Record, RecordType, RecordValue};
    use compound_zone::ZoneKey;
    use std::collections::BTreeSet;

    fn zone_key() -> ZoneKey {
        ZoneKey {
            provider_namespace: "default".into(),
            provider_name: "p".into(),
            zone_id: "zone-1".into(),
        }
    }

    fn record_value() -> RecordValue {
        RecordValue { ttl: 60, values: BTreeSet::from(["1.1.1.1".to_string()]), routing_policy: None }
    }

    #[test]
    fn recent_success_suppresses_error() {
        let registry = ZoneRegistry::new();
        let zone = registry.get_or_insert(zone_key(), "default/p");
        let key = RecordKey::new("a.example.test", RecordType::A);
        let entry = EntryRef::new("default", "e1");
        let mut record = zone.try_lock().unwrap();
        record.contribute(key.clone(), entry.clone(), record_value());
        record.last_success_at.insert(entry, 100);

        let op = ChangeOp::Create(Record { key: key.clone(), value: record_value() });
        let batch = ChangeSet { ops: vec![op] };
        let outcomes = vec![ChangeOutcome { index: 0, result: Err(ApplyError::Retryable("boom".into())) }];

        let suppressed = flap_suppression_map(&record, &batch, &outcomes, 130, 60);
        assert_eq!(suppressed.get(&key), Some(&true));
    }

    #[test]
    fn stale_success_does_not_suppress_error() {
        let registry = ZoneRegistry::new();
        let zone = registry.get_or_insert(zone_key(), "default/p");
        let key = RecordKey::new("a.example.test", RecordType::A);
        let entry = EntryRef::new("default", "e1");
        let mut record = zone.try_lock().unwrap();
        record.contribute(key.clone(), entry.clone(), record_value());
        record.last_success_at.insert(entry, 0);

        let op = ChangeOp::Create(Record { key: key.clone(), value: record_value() });
        let batch = ChangeSet { ops: vec![op] };
        let outcomes = vec![ChangeOutcome { index: 0, result: Err(ApplyError::Retryable("boom".into())) }];

        let suppressed = flap_suppression_map(&record, &batch, &outcomes, 130, 60);
        assert_eq!(suppressed.get(&key), Some(&false));
    }

    #[test]
    fn never_succeeded_does_not_suppress_error() {
        let registry = ZoneRegistry::new();
        let zone = registry.get_or_insert(zone_key(), "default/p");
        let key = RecordKey::new("a.example.test", RecordType::A);
        let entry = EntryRef::new("default", "e1");
        let mut record = zone.try_lock().unwrap();
        record.contribute(key.clone(), entry, record_value());

        let op = ChangeOp::Create(Record { key: key.clone(), value: record_value() });
        let batch = ChangeSet { ops: vec![op] };
        let outcomes = vec![ChangeOutcome { index: 0, result: Err(ApplyError::Retryable("boom".into())) }];

        let suppressed = flap_suppression_map(&record, &batch, &outcomes, 130, 60);
        assert_eq!(suppressed.get(&key), Some(&false));
    }
}
