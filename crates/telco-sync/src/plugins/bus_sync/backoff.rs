//! Reconnect backoff: exponential growth, capped, with proportional jitter

use rand::Rng;
use std::time::Duration;
use telco_core::config::BackoffConfig;

/// Delay generator for reconnect attempts
///
/// Attempt `n` (1-based) waits `initial * multiplier^(n-1)`, capped at `max`,
/// then scaled by a random factor in `1-jitter..=1+jitter`. The jittered delay
/// is capped at `max` again.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_ms),
            max: Duration::from_millis(config.max_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
            attempt: 0,
        }
    }

    /// Advance to the next attempt and return how long to wait before it
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let base = self.base_delay(self.attempt);
        if self.jitter <= 0.0 {
            return base;
        }

        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        base.mul_f64(factor).min(self.max)
    }

    /// Un-jittered delay for a 1-based attempt number
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        // f64::min also absorbs an overflow to infinity
        Duration::from_millis(ms.min(self.max.as_millis() as f64) as u64)
    }

    /// Start over after a successful connect
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts taken since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
