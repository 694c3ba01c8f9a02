//! In-memory mock backend (spec §2 "... and an in-memory mock"). Useful
//! for local development and the functional test scenarios of spec §8 —
//! the only backend adapter this core ships with, since every real SDK
//! adapter is explicitly out of scope (spec §1).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::handler::{BackendError, BackendHandler};
use crate::record::{ChangeOp, ChangeOutcome, ChangeSet, Record};

/// One mock zone: a domain suffix it claims, and the records currently
/// "published" in it.
struct MockZone {
    suffix: String,
    records: BTreeMap<crate::record::RecordKey, Record>,
}

#[derive(Default)]
struct State {
    zones: HashMap<String, MockZone>,
}

/// A backend handler that never leaves process memory. Zones are
/// registered up front by `(zone_id, suffix)`; `probe_zone_for_name`
/// picks the longest matching suffix, same shape as a real DNS backend's
/// zone listing would resolve.
#[derive(Default)]
pub struct MockBackend {
    state: RwLock<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a zone the mock backend "hosts". `suffix` should be
    /// normalized (lower-case, no trailing dot) the same way
    /// `compound_model::dns_name::normalize` would produce.
    pub fn add_zone(&self, zone_id: impl Into<String>, suffix: impl Into<String>) {
        let zone_id = zone_id.into();
        self.state.write().zones.insert(
            zone_id,
            MockZone {
                suffix: suffix.into(),
                records: BTreeMap::new(),
            },
        );
    }

    /// Test/inspection helper: current record count in a zone.
    pub fn record_count(&self, zone_id: &str) -> usize {
        self.state
            .read()
            .zones
            .get(zone_id)
            .map(|z| z.records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl BackendHandler for MockBackend {
    async fn probe_zone_for_name(&self, fqdn: &str) -> Result<Option<String>, BackendError> {
        let normalized = compound_model::dns_name::normalize(fqdn);
        let state = self.state.read();
        let best = state
            .zones
            .iter()
            .filter(|(_, z)| normalized == z.suffix || normalized.ends_with(&format!(".{}", z.suffix)))
            .max_by_key(|(_, z)| z.suffix.len());
        Ok(best.map(|(id, _)| id.clone()))
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>, BackendError> {
        let state = self.state.read();
        let zone = state
            .zones
            .get(zone_id)
            .ok_or_else(|| BackendError::Permanent(format!("unknown zone {zone_id:?}")))?;
        Ok(zone.records.values().cloned().collect())
    }

    async fn apply_change_set(
        &self,
        zone_id: &str,
        batch: &ChangeSet,
    ) -> Result<Vec<ChangeOutcome>, BackendError> {
        let mut state = self.state.write();
        let zone = state
            .zones
            .get_mut(zone_id)
            .ok_or_else(|| BackendError::Permanent(format!("unknown zone {zone_id:?}")))?;
        let mut outcomes = Vec::with_capacity(batch.ops.len());
        for (index, op) in batch.ops.iter().enumerate() {
            match op {
                ChangeOp::Create(record) | ChangeOp::Update { to: record, .. } => {
                    zone.records.insert(record.key.clone(), record.clone());
                }
                ChangeOp::Delete(record) => {
                    zone.records.remove(&record.key);
                }
            }
            outcomes.push(ChangeOutcome { index, result: Ok(()) });
        }
        Ok(outcomes)
    }

    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordKey, RecordType, RecordValue};
    use std::collections::BTreeSet;

    fn a_record(name: &str, ip: &str) -> Record {
        Record {
            key: RecordKey::new(name, RecordType::A),
            value: RecordValue {
                ttl: 120,
                values: BTreeSet::from([ip.to_string()]),
                routing_policy: None,
            },
        }
    }

    #[tokio::test]
    async fn probe_zone_for_name_picks_longest_suffix() {
        let backend = MockBackend::new();
        backend.add_zone("zone-1", "example.test");
        backend.add_zone("zone-2", "sub.example.test");

        assert_eq!(
            backend.probe_zone_for_name("a.sub.example.test").await.unwrap(),
            Some("zone-2".to_string())
        );
        assert_eq!(
            backend.probe_zone_for_name("a.example.test").await.unwrap(),
            Some("zone-1".to_string())
        );
        assert_eq!(backend.probe_zone_for_name("a.other.test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn apply_then_list_round_trips() {
        let backend = MockBackend::new();
        backend.add_zone("zone-1", "example.test");
        let batch = ChangeSet {
            ops: vec![ChangeOp::Create(a_record("a.example.test", "11.11.11.11"))],
        };
        let outcomes = backend.apply_change_set("zone-1", &batch).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());

        let records = backend.list_records("zone-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.name, "a.example.test");
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let backend = MockBackend::new();
        backend.add_zone("zone-1", "example.test");
        let record = a_record("a.example.test", "11.11.11.11");
        backend
            .apply_change_set(
                "zone-1",
                &ChangeSet {
                    ops: vec![ChangeOp::Create(record.clone())],
                },
            )
            .await
            .unwrap();
        backend
            .apply_change_set(
                "zone-1",
                &ChangeSet {
                    ops: vec![ChangeOp::Delete(record)],
                },
            )
            .await
            .unwrap();
        assert_eq!(backend.record_count("zone-1"), 0);
    }
}
