// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter for deferred remote operations.
//!
//! Retry attempt `n` (0-indexed) waits `min(max_delay, min_delay * factor^n)`,
//! scaled by a uniform multiplier in `[1 - jitter, 1 + jitter]`.

use rand::Rng;
use std::time::Duration;

/// Backoff parameters shared by every retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound on the pre-jitter delay.
    pub max_delay: Duration,
    /// Growth factor per attempt. Values below 1.0 are treated as 1.0.
    pub factor: f64,
    /// Relative jitter, clamped to `[0, 1]`.
    pub jitter: f64,
    /// Maximum number of retries per operation (`None` = unlimited).
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            min_delay: Duration::from_millis(2_000),
            max_delay: Duration::from_millis(120_000),
            factor: 1.5,
            jitter: 0.05,
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Pre-jitter delay for the given retry attempt.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let min = self.min_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64().max(min);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = min * self.factor.max(1.0).powi(exponent);
        Duration::from_secs_f64(raw.min(max))
    }

    /// Jittered delay for the given retry attempt, using the thread RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::rng())
    }

    /// Jittered delay for the given retry attempt, using the supplied RNG.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = self.jitter.clamp(0.0, 1.0);
        let multiplier = rng.random_range((1.0 - jitter)..=(1.0 + jitter));
        self.base_delay(attempt).mul_f64(multiplier)
    }

    /// Whether retry attempt `attempt` is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
