//! The generic record/change-set schema every backend handler speaks
//! (spec §4.6: "Adapters ... map the generic record/routing-policy schema
//! into native calls"). The core never imports a backend SDK type.

use std::collections::BTreeSet;

use compound_types::RoutingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
        };
        write!(f, "{s}")
    }
}

/// `(dns-name, record-type)`, the key the desired/observed record maps in
/// the owned zone model are keyed on (spec §3 "Owned Zone").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub name: String,
    pub record_type: RecordType,
}

impl RecordKey {
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
        }
    }
}

/// A record's mutable value: TTL, value set (multiset semantics preserved
/// via a sorted `BTreeSet` of formatted values, since DNS value order is
/// not significant but duplicates would be), and optional routing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordValue {
    pub ttl: u32,
    pub values: BTreeSet<String>,
    pub routing_policy: Option<RoutingPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: RecordKey,
    pub value: RecordValue,
}

impl Record {
    /// Two records are equal iff they share name, type, TTL, value-set,
    /// and routing policy (spec §4.5 "Diff rules").
    pub fn matches(&self, other: &Record) -> bool {
        self.key == other.key && self.value == other.value
    }
}

/// One half of a batched change (spec §4.5 "Apply rules": "Operations are
/// grouped into a single batch per tick").
#[derive(Debug, Clone)]
pub enum ChangeOp {
    Create(Record),
    Update { from: Record, to: Record },
    Delete(Record),
}

impl ChangeOp {
    pub fn key(&self) -> &RecordKey {
        match self {
            ChangeOp::Create(r) | ChangeOp::Delete(r) => &r.key,
            ChangeOp::Update { to, .. } => &to.key,
        }
    }
}

/// A full batch submitted in one `applyChangeSet` call.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub ops: Vec<ChangeOp>,
}

/// Per-change-set-member outcome returned by a handler (spec §4.6
/// "returning per-change outcomes with {ok, retryable-err, permanent-err}").
#[derive(Debug, Clone)]
pub struct ChangeOutcome {
    pub index: usize,
    pub result: Result<(), ApplyError>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApplyError {
    #[error("retryable backend error: {0}")]
    Retryable(String),
    #[error("permanent backend error: {0}")]
    Permanent(String),
}

impl ApplyError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, ApplyError::Permanent(_))
    }
}
