//! Desired-vs-observed diffing (spec §4.5 "Diff rules"): "A create is
//! emitted when desired has a key absent from observed; a delete when
//! observed has a key absent from desired and the key is in the
//! provider's include-scope (records outside scope are never touched,
//! even if observed); an update otherwise."

use std::collections::HashMap;

use compound_backend::{ChangeOp, Record, RecordKey, RecordValue};

/// A desired record, as compiled from every Entry routed to this key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desired {
    pub value: RecordValue,
}

/// Computes the change set to bring `observed` into agreement with
/// `desired`. `in_scope` tells the diff whether an observed-only key may
/// be deleted at all — records outside the provider's include-scope are
/// never touched regardless of what's cached (spec §3 invariant / §8
/// "Scope exclusion").
pub fn diff(
    desired: &HashMap<RecordKey, Desired>,
    observed: &HashMap<RecordKey, Record>,
    in_scope: impl Fn(&RecordKey) -> bool,
) -> Vec<ChangeOp> {
    let mut ops = Vec::new();

    for (key, want) in desired {
        match observed.get(key) {
            None => ops.push(ChangeOp::Create(Record {
                key: key.clone(),
                value: want.value.clone(),
            })),
            Some(have) if have.value != want.value => ops.push(ChangeOp::Update {
                from: have.clone(),
                to: Record {
                    key: key.clone(),
                    value: want.value.clone(),
                },
            }),
            Some(_) => {}
        }
    }

    for (key, have) in observed {
        if !desired.contains_key(key) && in_scope(key) {
            ops.push(ChangeOp::Delete(have.clone()));
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use compound_backend::RecordType;
    use std::collections::BTreeSet;

    fn value(ip: &str) -> RecordValue {
        RecordValue {
            ttl: 120,
            values: BTreeSet::from([ip.to_string()]),
            routing_policy: None,
        }
    }

    #[test]
    fn emits_create_for_new_desired_key() {
        let key = RecordKey::new("a.example.test", RecordType::A);
        let desired = HashMap::from([(key.clone(), Desired { value: value("1.1.1.1") })]);
        let ops = diff(&desired, &HashMap::new(), |_| true);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Create(_)));
    }

    #[test]
    fn emits_update_when_value_changed() {
        let key = RecordKey::new("a.example.test", RecordType::A);
        let desired = HashMap::from([(key.clone(), Desired { value: value("2.2.2.2") })]);
        let observed = HashMap::from([(
            key.clone(),
            Record {
                key: key.clone(),
                value: value("1.1.1.1"),
            },
        )]);
        let ops = diff(&desired, &observed, |_| true);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], ChangeOp::Update { .. }));
    }

    #[test]
    fn emits_nothing_when_equal() {
        let key = RecordKey::new("a.example.test", RecordType::A);
        let desired = HashMap::from([(key.clone(), Desired { value: value("1.1.1.1") })]);
        let observed = HashMap::from([(
            key.clone(),
            Record {
                key: key.clone(),
                value: value("1.1.1.1"),
            },
        )]);
        assert!(diff(&desired, &observed, |_| true).is_empty());
    }

    #[test]
    fn deletes_observed_only_when_in_scope() {
        let key = RecordKey::new("stale.example.test", RecordType::A);
        let observed = HashMap::from([(
            key.clone(),
            Record {
                key: key.clone(),
                value: value("1.1.1.1"),
            },
        )]);
        let in_scope_ops = diff(&HashMap::new(), &observed, |_| true);
        assert_eq!(in_scope_ops.len(), 1);
        assert!(matches!(in_scope_ops[0], ChangeOp::Delete(_)));

        let out_of_scope_ops = diff(&HashMap::new(), &observed, |_| false);
        assert!(out_of_scope_ops.is_empty());
    }
}
