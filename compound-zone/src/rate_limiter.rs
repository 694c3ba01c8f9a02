//! The per-zone apply rate limiter (spec §4.5: "additive-increase
//! multiplicative-increase (initial 1s, factor 1.1, cap 20x initial,
//! minimum increment min/10) — it increases the delay after any failed
//! apply and resets to zero after a fully successful apply").

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct AimdConfig {
    pub initial: Duration,
    pub factor: f64,
    pub cap_multiplier: u32,
    /// The minimum delay increment is `initial / min_increment_divisor`.
    pub min_increment_divisor: u32,
}

impl Default for AimdConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            factor: 1.1,
            cap_multiplier: 20,
            min_increment_divisor: 10,
        }
    }
}

impl AimdConfig {
    fn cap(&self) -> Duration {
        self.initial * self.cap_multiplier
    }

    fn min_increment(&self) -> Duration {
        self.initial / self.min_increment_divisor
    }
}

/// A single zone's AIMD apply limiter. `current` is the delay the next
/// apply attempt must wait out; it starts at zero (no delay) and only
/// grows once a failure is observed.
#[derive(Debug, Clone)]
pub struct AimdLimiter {
    config: AimdConfig,
    current: Duration,
}

impl AimdLimiter {
    pub fn new(config: AimdConfig) -> Self {
        Self {
            config,
            current: Duration::ZERO,
        }
    }

    /// Delay the next apply must wait before it is attempted.
    pub fn delay(&self) -> Duration {
        self.current
    }

    /// Records a failed apply: multiplicative growth with a minimum
    /// absolute increment so a factor of 1.1 still makes visible progress
    /// starting from a small or zero delay, capped at 20x the initial.
    pub fn on_failure(&mut self) {
        let cap = self.config.cap();
        if self.current.is_zero() {
            self.current = self.config.initial.min(cap);
            return;
        }
        let scaled = self.current.mul_f64(self.config.factor);
        let stepped = scaled.max(self.current + self.config.min_increment());
        self.current = stepped.min(cap);
    }

    /// Records a fully successful apply: resets the delay to zero.
    pub fn on_success(&mut self) {
        self.current = Duration::ZERO;
    }
}

impl Default for AimdLimiter {
    fn default() -> Self {
        Self::new(AimdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_delay() {
        let limiter = AimdLimiter::default();
        assert_eq!(limiter.delay(), Duration::ZERO);
    }

    #[test]
    fn failures_grow_and_cap() {
        let mut limiter = AimdLimiter::default();
        for _ in 0..500 {
            limiter.on_failure();
        }
        assert_eq!(limiter.delay(), Duration::from_secs(20));
    }

    #[test]
    fn success_resets_to_zero() {
        let mut limiter = AimdLimiter::default();
        limiter.on_failure();
        limiter.on_failure();
        assert!(limiter.delay() > Duration::ZERO);
        limiter.on_success();
        assert_eq!(limiter.delay(), Duration::ZERO);
    }

    #[test]
    fn first_failure_jumps_to_initial() {
        let mut limiter = AimdLimiter::default();
        limiter.on_failure();
        assert_eq!(limiter.delay(), Duration::from_secs(1));
    }
}
