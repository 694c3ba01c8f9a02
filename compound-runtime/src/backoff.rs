//! Jittered exponential backoff for queue retries (spec §4.2: "Failed and
//! Repeat results drive exponential backoff with jitter (initial delay,
//! factor, cap all configurable)"). The zone reconciler's apply-path rate
//! limiter uses a different, additive-increase rule (spec §4.5) and lives
//! in `compound-zone` instead — this one is the generic retry curve shared
//! by reconcile failures, lease renew failures, and conflict retries.

use rand::Rng;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub factor: f64,
    pub cap: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            factor: 2.0,
            cap: Duration::from_secs(300),
        }
    }
}

impl BackoffConfig {
    pub fn new(initial: Duration, factor: f64, cap: Duration) -> Self {
        Self { initial, factor, cap }
    }

    /// Delay before the `attempt`-th retry (0-indexed: the first retry is
    /// attempt 0). Full jitter: uniformly sampled between zero and the
    /// capped exponential value, so a thundering herd of keys failing at
    /// the same moment doesn't retry in lockstep.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial.as_secs_f64() * self.factor.powi(attempt as i32);
        let capped = scaled.min(self.cap.as_secs_f64()).max(0.0);
        if capped == 0.0 {
            return Duration::ZERO;
        }
        let jittered = rand::rng().random_range(0.0..=capped);
        Duration::from_secs_f64(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_cap() {
        let cfg = BackoffConfig::new(Duration::from_millis(100), 3.0, Duration::from_secs(1));
        for attempt in 0..20 {
            assert!(cfg.delay_for(attempt) <= Duration::from_secs(1));
        }
    }

    #[test]
    fn grows_with_attempt_on_average() {
        let cfg = BackoffConfig::new(Duration::from_millis(10), 2.0, Duration::from_secs(60));
        // First attempt's max possible delay is strictly less than a later attempt's.
        let early_ceiling = cfg.initial.as_secs_f64() * cfg.factor.powi(0);
        let later_ceiling = cfg.initial.as_secs_f64() * cfg.factor.powi(5);
        assert!(later_ceiling > early_ceiling);
    }
}
