//! Per-zone registry shared by the Provider/Entry reconcilers and the
//! zone ticker (spec §4.5 "State per zone"; spec §5 "each zone's state
//! is owned by exactly one worker at any instant" — enforced here by an
//! async mutex per zone rather than by task affinity, since the ticker
//! and both reconcilers can all touch the same zone).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use compound_backend::{RecordKey, RecordValue};
use compound_zone::{AimdConfig, BackPressureConfig, Desired, OwnedZoneState, ZoneKey};
use tokio::sync::Mutex;

/// Identifies the `DNSEntry` that contributed a record value, so a
/// contribution can be retracted when that Entry is deleted or
/// reassigned to a different provider/zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub namespace: String,
    pub name: String,
}

impl EntryRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Contribution {
    pub entry: EntryRef,
    pub value: RecordValue,
}

/// Per-zone state plus the bookkeeping `compound_zone::OwnedZoneState`
/// deliberately stays ignorant of: which Entry contributed each desired
/// key, and which Entries are waiting on a delete to be observed before
/// their finalizer can be removed.
pub struct ZoneRecord {
    pub zone_key: ZoneKey,
    pub provider_key: String,
    pub domain_include: Vec<String>,
    pub domain_exclude: Vec<String>,
    pub state: OwnedZoneState,
    pub contributors: HashMap<RecordKey, Vec<Contribution>>,
    pub pending_deletions: HashMap<EntryRef, HashSet<RecordKey>>,
    /// Last tick (unix seconds) an Entry's contribution was part of a
    /// fully successful apply, used to suppress flapping an otherwise-Ready
    /// Entry to `Error` over a backend outage shorter than the configured
    /// threshold (spec §4.5 "never clear a Ready status due to a transient
    /// backend error shorter than a configurable threshold").
    pub last_success_at: HashMap<EntryRef, i64>,
    /// Ticks since this zone last entered [`compound_zone::OwnedZoneState::is_degraded`];
    /// used to down-sample how often a degraded zone's batch is actually
    /// submitted (spec §4.5 "down-samples the per-entry reconcile rate").
    pub degraded_skip_counter: u32,
    /// Whether the one-time "zone degraded" warning event has already
    /// been emitted for the current degraded streak; reset once the zone
    /// recovers.
    pub degraded_event_emitted: bool,
}

impl ZoneRecord {
    fn new(zone_key: ZoneKey, provider_key: String) -> Self {
        Self {
            zone_key,
            provider_key,
            domain_include: Vec::new(),
            domain_exclude: Vec::new(),
            state: OwnedZoneState::new(AimdConfig::default(), BackPressureConfig::default()),
            contributors: HashMap::new(),
            pending_deletions: HashMap::new(),
            last_success_at: HashMap::new(),
            degraded_skip_counter: 0,
            degraded_event_emitted: false,
        }
    }

    /// Merges `value` into the record at `key`, attributed to `entry`. A
    /// key may be contributed to by more than one Entry (e.g. a weighted
    /// routing-policy set sharing one name/type); the merge unions value
    /// sets and keeps the lowest TTL among contributors — a deliberate
    /// simplification of full multi-value routing-policy materialization,
    /// noted in the project's design ledger.
    pub fn contribute(&mut self, key: RecordKey, entry: EntryRef, value: RecordValue) {
        let list = self.contributors.entry(key.clone()).or_default();
        list.retain(|c| c.entry != entry);
        list.push(Contribution { entry, value });
        self.recompute_desired(&key);
    }

    /// Retracts every contribution `entry` made across all keys,
    /// returning the keys whose desired value changed as a result.
    pub fn retract_entry(&mut self, entry: &EntryRef) -> HashSet<RecordKey> {
        let mut touched = HashSet::new();
        for (key, list) in self.contributors.iter_mut() {
            let before = list.len();
            list.retain(|c| &c.entry != entry);
            if list.len() != before {
                touched.insert(key.clone());
            }
        }
        self.contributors.retain(|_, list| !list.is_empty());
        for key in touched.clone() {
            self.recompute_desired(&key);
        }
        touched
    }

    fn recompute_desired(&mut self, key: &RecordKey) {
        match self.contributors.get(key) {
            None => {
                self.state.desired.remove(key);
            }
            Some(list) => {
                let merged = merge_contributions(list);
                self.state.desired.insert(key.clone(), Desired { value: merged });
            }
        }
    }

    /// Whether `key` falls inside this provider's domain include-scope
    /// and outside its exclude-scope (spec §4.5 "records outside scope
    /// are never touched, even if observed").
    pub fn in_scope(&self, key: &RecordKey) -> bool {
        if self.domain_exclude.iter().any(|s| suffix_matches(&key.name, s)) {
            return false;
        }
        self.domain_include.is_empty() || self.domain_include.iter().any(|s| suffix_matches(&key.name, s))
    }

    /// Clears pending-deletion entries whose keys no longer appear in
    /// `observed`, returning the Entries whose deletion is now fully
    /// confirmed (spec §4.5 "only once the delete is observed ... does
    /// the reconciler remove its finalizer").
    pub fn finalize_observed_deletions(&mut self) -> Vec<EntryRef> {
        let observed = &self.state.observed;
        let mut done = Vec::new();
        self.pending_deletions.retain(|entry, keys| {
            keys.retain(|k| observed.contains_key(k));
            if keys.is_empty() {
                done.push(entry.clone());
                false
            } else {
                true
            }
        });
        done
    }
}

fn suffix_matches(name: &str, suffix: &str) -> bool {
    let suffix = compound_model::dns_name::normalize(suffix);
    name == suffix || name.ends_with(&format!(".{suffix}"))
}

fn merge_contributions(list: &[Contribution]) -> RecordValue {
    let mut values = std::collections::BTreeSet::new();
    let mut ttl = u32::MAX;
    let mut routing_policy = None;
    for c in list {
        values.extend(c.value.values.iter().cloned());
        ttl = ttl.min(c.value.ttl);
        if routing_policy.is_none() {
            routing_policy = c.value.routing_policy.clone();
        }
    }
    RecordValue { ttl, values, routing_policy }
}

/// Registry of every `(provider, zone)` this process currently owns
/// state for, keyed the same way `compound_zone::ZoneKey` addresses a
/// provider and its zones.
#[derive(Clone, Default)]
pub struct ZoneRegistry {
    zones: Arc<parking_lot::RwLock<HashMap<ZoneKey, Arc<Mutex<ZoneRecord>>>>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert(&self, key: ZoneKey, provider_key: impl Into<String>) -> Arc<Mutex<ZoneRecord>> {
        if let Some(existing) = self.zones.read().get(&key) {
            return existing.clone();
        }
        let mut guard = self.zones.write();
        guard
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ZoneRecord::new(key, provider_key.into()))))
            .clone()
    }

    pub fn get(&self, key: &ZoneKey) -> Option<Arc<Mutex<ZoneRecord>>> {
        self.zones.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<ZoneKey> {
        self.zones.read().keys().cloned().collect()
    }

    /// Drops a zone's state entirely once it holds no desired/observed
    /// records and no pending deletions. Called by the ticker after a
    /// reconcile pass, not by reconcilers directly, since only the
    /// ticker observes the backend state needed to know the zone is
    /// truly empty.
    pub fn remove_if_empty(&self, key: &ZoneKey) {
        let mut guard = self.zones.write();
        let Some(zone) = guard.get(key) else { return };
        let Ok(record) = zone.try_lock() else { return };
        if record.state.is_empty_of_managed_records() && record.pending_deletions.is_empty() {
            drop(record);
            guard.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compound_backend::RecordType;
    use std::collections::BTreeSet;

    fn value(ip: &str) -> RecordValue {
        RecordValue { ttl: 120, values: BTreeSet::from([ip.to_string()]), routing_policy: None }
    }

    #[test]
    fn contribute_then_retract_clears_desired() {
        let registry = ZoneRegistry::new();
        let zone_key = ZoneKey {
            provider_namespace: "default".into(),
            provider_name: "p".into(),
            zone_id: "zone-1".into(),
        };
        let zone = registry.get_or_insert(zone_key, "default/p");
        let key = RecordKey::new("a.example.test", RecordType::A);
        let entry = EntryRef::new("default", "e1");

        {
            let mut record = zone.try_lock().unwrap();
            record.contribute(key.clone(), entry.clone(), value("1.1.1.1"));
            assert!(record.state.desired.contains_key(&key));
        }
        {
            let mut record = zone.try_lock().unwrap();
            let touched = record.retract_entry(&entry);
            assert!(touched.contains(&key));
            assert!(!record.state.desired.contains_key(&key));
        }
    }

    #[test]
    fn in_scope_respects_include_and_exclude() {
        let registry = ZoneRegistry::new();
        let zone_key = ZoneKey {
            provider_namespace: "default".into(),
            provider_name: "p".into(),
            zone_id: "zone-1".into(),
        };
        let zone = registry.get_or_insert(zone_key, "default/p");
        {
            let mut record = zone.try_lock().unwrap();
            record.domain_include = vec!["example.test".to_string()];
            record.domain_exclude = vec!["excluded.example.test".to_string()];
        }
        let record = zone.try_lock().unwrap();
        assert!(record.in_scope(&RecordKey::new("a.example.test", RecordType::A)));
        assert!(!record.in_scope(&RecordKey::new("a.excluded.example.test", RecordType::A)));
        assert!(!record.in_scope(&RecordKey::new("a.other.test", RecordType::A)));
    }
}
