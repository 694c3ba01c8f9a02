//! Back-pressure detection (spec §4.5: "If `pending` grows faster than it
//! drains for a configurable window, the zone is marked Degraded, which
//! down-samples the per-entry reconcile rate and emits an event").
//!
//! The framework never calls a clock itself (spec §4.2's `ShutdownGuard`
//! follows the same rule) — callers supply a monotonic second counter so
//! this stays deterministic and unit-testable.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct BackPressureConfig {
    /// How long a sustained growth trend must persist before the zone is
    /// marked Degraded.
    pub window_secs: i64,
    /// Minimum number of samples inside the window before a verdict is
    /// drawn, to avoid flapping on a single noisy tick.
    pub min_samples: usize,
}

impl Default for BackPressureConfig {
    fn default() -> Self {
        Self {
            window_secs: 120,
            min_samples: 3,
        }
    }
}

/// Tracks `pending` queue-length samples over a sliding time window and
/// decides whether the zone is growing (Degraded) or draining (healthy).
#[derive(Debug, Clone)]
pub struct BackPressureTracker {
    config: BackPressureConfig,
    samples: VecDeque<(i64, usize)>,
    degraded: bool,
}

impl BackPressureTracker {
    pub fn new(config: BackPressureConfig) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
            degraded: false,
        }
    }

    /// Records the current `pending` length at `now_secs` and re-evaluates
    /// the degraded verdict. Returns `true` if the zone is (now) degraded.
    pub fn observe(&mut self, now_secs: i64, pending_len: usize) -> bool {
        self.samples.push_back((now_secs, pending_len));
        let cutoff = now_secs - self.config.window_secs;
        while self.samples.front().is_some_and(|(t, _)| *t < cutoff) {
            self.samples.pop_front();
        }

        if self.samples.len() < self.config.min_samples {
            return self.degraded;
        }

        let oldest = self.samples.front().unwrap().1;
        let newest = self.samples.back().unwrap().1;
        self.degraded = newest > oldest && pending_len > 0;
        self.degraded
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

impl Default for BackPressureTracker {
    fn default() -> Self {
        Self::new(BackPressureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_sustained_growth() {
        let mut tracker = BackPressureTracker::new(BackPressureConfig {
            window_secs: 60,
            min_samples: 3,
        });
        assert!(!tracker.observe(0, 1));
        assert!(!tracker.observe(10, 2));
        assert!(tracker.observe(20, 5));
    }

    #[test]
    fn does_not_flag_draining_backlog() {
        let mut tracker = BackPressureTracker::new(BackPressureConfig {
            window_secs: 60,
            min_samples: 3,
        });
        tracker.observe(0, 10);
        tracker.observe(10, 5);
        assert!(!tracker.observe(20, 1));
    }

    #[test]
    fn ignores_noise_below_min_samples() {
        let mut tracker = BackPressureTracker::new(BackPressureConfig {
            window_secs: 60,
            min_samples: 5,
        });
        assert!(!tracker.observe(0, 1));
        assert!(!tracker.observe(10, 100));
    }
}
