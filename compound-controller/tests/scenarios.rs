//! End-to-end scenarios over the core reconciliation pieces (selection,
//! compilation, zone registry, mock backend) without a live Kubernetes
//! API server — the status write-back and watch plumbing need a real
//! `kube::Client` and are covered instead by the unit tests alongside
//! `zone::ticker` and `entry::reconcile`.

use std::collections::BTreeSet;

use compound_backend::{BackendHandler, ChangeSet, MockBackend, RecordType};
use compound_controller::entry::compile;
use compound_controller::zone::{EntryRef, ZoneRegistry};
use compound_provider::{ProviderKey, ProviderRecord, ProviderRegistry, ScopeSet};
use compound_types::{DNSEntrySpec, EntryValues, ProviderType};

fn provider(domains: &[&str]) -> ProviderRecord {
    ProviderRecord {
        key: ProviderKey::new("default", "p"),
        provider_type: ProviderType::Mock,
        domains: ScopeSet {
            include: domains.iter().map(|s| s.to_string()).collect(),
            exclude: vec![],
        },
        zones: ScopeSet::default(),
        default_ttl: 300,
    }
}

async fn apply_one(backend: &MockBackend, zone_id: &str, spec: &DNSEntrySpec, default_ttl: u32) {
    let registry = ZoneRegistry::new();
    let zone_key = compound_zone::ZoneKey {
        provider_namespace: "default".into(),
        provider_name: "p".into(),
        zone_id: zone_id.into(),
    };
    let zone = registry.get_or_insert(zone_key, "default/p");
    {
        let mut zone = zone.lock().await;
        zone.domain_include = vec!["example.test".into(), "wc.example.test".into()];
        for (key, value) in compile::compile(spec, default_ttl) {
            zone.contribute(key, EntryRef::new("default", "e"), value);
        }
    }
    let mut zone = zone.lock().await;
    zone.state.recompute_pending(|_| true);
    let batch = ChangeSet { ops: std::mem::take(&mut zone.state.pending) };
    let outcomes = backend.apply_change_set(zone_id, &batch).await.unwrap();
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
}

#[tokio::test]
async fn scenario_basic_a_record() {
    let backend = MockBackend::new();
    backend.add_zone("zone-1", "example.test");
    let spec = DNSEntrySpec {
        dns_name: "a.example.test".into(),
        ttl: Some(120),
        values: EntryValues::Targets { targets: vec!["11.11.11.11".into()] },
        routing_policy: None,
    };
    apply_one(&backend, "zone-1", &spec, 300).await;

    let records = backend.list_records("zone-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key.record_type, RecordType::A);
    assert_eq!(records[0].value.ttl, 120);
    assert_eq!(records[0].value.values, BTreeSet::from(["11.11.11.11".to_string()]));
}

#[tokio::test]
async fn scenario_txt_multi_line() {
    let backend = MockBackend::new();
    backend.add_zone("zone-1", "example.test");
    let spec = DNSEntrySpec {
        dns_name: "txt.example.test".into(),
        ttl: None,
        values: EntryValues::Text { text: vec!["line1".into(), "line2 bla bla".into()] },
        routing_policy: None,
    };
    apply_one(&backend, "zone-1", &spec, 300).await;

    let records = backend.list_records("zone-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key.record_type, RecordType::Txt);
    assert_eq!(
        records[0].value.values,
        BTreeSet::from(["\"line1\"".to_string(), "\"line2 bla bla\"".to_string()])
    );
}

#[tokio::test]
async fn scenario_cname() {
    let backend = MockBackend::new();
    backend.add_zone("zone-1", "example.test");
    let spec = DNSEntrySpec {
        dns_name: "alias.example.test".into(),
        ttl: Some(300),
        values: EntryValues::Targets { targets: vec!["google-public-dns-a.google.com".into()] },
        routing_policy: None,
    };
    apply_one(&backend, "zone-1", &spec, 300).await;

    let records = backend.list_records("zone-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key.record_type, RecordType::Cname);
    assert!(records[0].value.values.contains("google-public-dns-a.google.com"));
}

#[tokio::test]
async fn scenario_wildcard() {
    let backend = MockBackend::new();
    backend.add_zone("zone-1", "example.test");
    let spec = DNSEntrySpec {
        dns_name: "*.wc.example.test".into(),
        ttl: Some(60),
        values: EntryValues::Targets { targets: vec!["44.44.44.44".into()] },
        routing_policy: None,
    };
    apply_one(&backend, "zone-1", &spec, 300).await;

    let records = backend.list_records("zone-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key.name, "*.wc.example.test");
}

#[tokio::test]
async fn scenario_foreign_domain_has_no_provider() {
    let registry = ProviderRegistry::new();
    registry.replace(vec![provider(&["example.test"])]);
    let resolution = registry.snapshot().resolve("x.other.test");
    assert!(resolution.chosen().is_none());
}

#[tokio::test]
async fn scenario_deletion_clears_desired_and_confirms_on_empty_observed() {
    let backend = MockBackend::new();
    backend.add_zone("zone-1", "example.test");
    let spec = DNSEntrySpec {
        dns_name: "a.example.test".into(),
        ttl: Some(120),
        values: EntryValues::Targets { targets: vec!["11.11.11.11".into()] },
        routing_policy: None,
    };
    apply_one(&backend, "zone-1", &spec, 300).await;
    assert_eq!(backend.record_count("zone-1"), 1);

    let registry = ZoneRegistry::new();
    let zone_key = compound_zone::ZoneKey {
        provider_namespace: "default".into(),
        provider_name: "p".into(),
        zone_id: "zone-1".into(),
    };
    let zone = registry.get_or_insert(zone_key, "default/p");
    let entry = EntryRef::new("default", "e");
    {
        let mut zone = zone.lock().await;
        zone.domain_include = vec!["example.test".into()];
        for (key, value) in compile::compile(&spec, 300) {
            zone.contribute(key, entry.clone(), value);
        }
    }

    // Deletion: retract the entry's contributions and mark the affected
    // keys pending until the backend confirms them gone.
    {
        let mut zone = zone.lock().await;
        let touched = zone.retract_entry(&entry);
        assert!(!touched.is_empty());
        zone.pending_deletions.insert(entry.clone(), touched);
        zone.state.recompute_pending(|_| true);
    }

    let batch = {
        let mut zone = zone.lock().await;
        ChangeSet { ops: std::mem::take(&mut zone.state.pending) }
    };
    backend.apply_change_set("zone-1", &batch).await.unwrap();
    assert_eq!(backend.record_count("zone-1"), 0);

    // The ticker refreshes `observed` from the backend before checking
    // whether a pending deletion can be finalized.
    let mut zone = zone.lock().await;
    zone.state.observed = backend
        .list_records("zone-1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.key.clone(), r))
        .collect();
    let finalized = zone.finalize_observed_deletions();
    assert_eq!(finalized, vec![entry]);
}
