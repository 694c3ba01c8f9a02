//! Per-`(provider, zone)` state (spec §3 "Owned Zone (derived, in-memory)",
//! spec §4.5 "State per zone"). Pure data plus the recompute/apply-result
//! bookkeeping the Zone Reconciler drives; the actual backend I/O and
//! status write-back live in the controller, which owns a `kube::Client`
//! and a `compound_backend::BackendHandler` this crate deliberately does
//! not depend on doing IO with directly (it only uses the data types).

use std::collections::HashMap;

use compound_backend::{ChangeOp, Record, RecordKey};

use crate::backpressure::{BackPressureConfig, BackPressureTracker};
use crate::diff::{self, Desired};
use crate::rate_limiter::{AimdConfig, AimdLimiter};

/// Key identifying one owned zone: a provider's resource identity paired
/// with the backend's opaque zone id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneKey {
    pub provider_namespace: String,
    pub provider_name: String,
    pub zone_id: String,
}

pub struct OwnedZoneState {
    pub desired: HashMap<RecordKey, Desired>,
    pub observed: HashMap<RecordKey, Record>,
    pub pending: Vec<ChangeOp>,
    pub inflight: Option<Vec<ChangeOp>>,
    pub rate_limiter: AimdLimiter,
    back_pressure: BackPressureTracker,
    pub last_apply_at: Option<i64>,
    pub last_error: Option<String>,
    pub last_full_reconcile: Option<i64>,
}

impl OwnedZoneState {
    pub fn new(rate_limiter_config: AimdConfig, back_pressure_config: BackPressureConfig) -> Self {
        Self {
            desired: HashMap::new(),
            observed: HashMap::new(),
            pending: Vec::new(),
            inflight: None,
            rate_limiter: AimdLimiter::new(rate_limiter_config),
            back_pressure: BackPressureTracker::new(back_pressure_config),
            last_apply_at: None,
            last_error: None,
            last_full_reconcile: None,
        }
    }

    /// Recomputes `pending` from the current `desired`/`observed` maps.
    /// `in_scope` should reflect the provider's current include-scope so a
    /// scope change is honored immediately on the next recompute.
    pub fn recompute_pending(&mut self, in_scope: impl Fn(&RecordKey) -> bool) {
        self.pending = diff::diff(&self.desired, &self.observed, in_scope);
    }

    /// Whether this zone currently has no controller-managed records
    /// left, the condition that unblocks Provider deletion (spec §4.5
    /// "Provider deletion is blocked until its owned-zone state is empty
    /// of controller-managed records").
    pub fn is_empty_of_managed_records(&self) -> bool {
        self.desired.is_empty() && self.observed.is_empty() && self.pending.is_empty()
    }

    /// Records the outcome of an apply attempt: feeds the AIMD limiter and
    /// the back-pressure tracker, and remembers the last error for
    /// diagnostics. `all_ok` means every change in the submitted batch
    /// succeeded (spec §4.5 "resets to zero after a fully successful
    /// apply").
    pub fn record_apply(&mut self, now_secs: i64, all_ok: bool, error: Option<String>) -> bool {
        self.last_apply_at = Some(now_secs);
        if all_ok {
            self.rate_limiter.on_success();
            self.last_error = None;
        } else {
            self.rate_limiter.on_failure();
            self.last_error = error;
        }
        self.back_pressure.observe(now_secs, self.pending.len())
    }

    pub fn is_degraded(&self) -> bool {
        self.back_pressure.is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compound_backend::{RecordType, RecordValue};
    use std::collections::BTreeSet;

    fn desired_value(ip: &str) -> Desired {
        Desired {
            value: RecordValue {
                ttl: 120,
                values: BTreeSet::from([ip.to_string()]),
                routing_policy: None,
            },
        }
    }

    #[test]
    fn recompute_pending_produces_create_for_new_desired() {
        let mut state = OwnedZoneState::new(AimdConfig::default(), BackPressureConfig::default());
        let key = RecordKey::new("a.example.test", RecordType::A);
        state.desired.insert(key, desired_value("1.1.1.1"));
        state.recompute_pending(|_| true);
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn apply_success_resets_rate_limiter() {
        let mut state = OwnedZoneState::new(AimdConfig::default(), BackPressureConfig::default());
        state.record_apply(0, false, Some("boom".into()));
        assert!(state.rate_limiter.delay() > std::time::Duration::ZERO);
        state.record_apply(1, true, None);
        assert_eq!(state.rate_limiter.delay(), std::time::Duration::ZERO);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn empty_of_managed_records_when_everything_cleared() {
        let state = OwnedZoneState::new(AimdConfig::default(), BackPressureConfig::default());
        assert!(state.is_empty_of_managed_records());
    }
}
