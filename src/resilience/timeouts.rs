//! Adaptive read timeout estimation.
//!
//! # Responsibilities
//! - Derive a per-attempt read deadline from the expected body size
//! - Apply the adaptive multiplier, then clamp to the ceiling
//!
//! # Design Decisions
//! - Assumes a conservative floor transfer rate of 1 MiB/s
//! - The ceiling is applied after the multiplier, so the result never exceeds it
//! - Recomputed for every attempt, never cached across retries

use std::time::Duration;

use crate::config::schema::{DEFAULT_ADAPTIVE_FACTOR, DEFAULT_MAX_SECS, DEFAULT_READ_SECS};
use crate::config::TimeoutConfig;

const MIB: u64 = 1024 * 1024;

/// Computes read deadlines from size hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutEstimator {
    /// Minimum timeout before scaling.
    pub base: Duration,
    /// Multiplier applied after the size estimate.
    pub adaptive_factor: f64,
    /// Hard upper bound.
    pub ceiling: Duration,
}

impl TimeoutEstimator {
    /// Zero durations and non-positive factors fall back to the defaults.
    pub fn new(base: Duration, adaptive_factor: f64, ceiling: Duration) -> Self {
        Self {
            base: heal_duration(base, DEFAULT_READ_SECS),
            adaptive_factor: if adaptive_factor.is_finite() && adaptive_factor > 0.0 {
                adaptive_factor
            } else {
                DEFAULT_ADAPTIVE_FACTOR
            },
            ceiling: heal_duration(ceiling, DEFAULT_MAX_SECS),
        }
    }

    /// Replace the base timeout, keeping the default when zero.
    pub fn with_base(mut self, base: Duration) -> Self {
        self.base = heal_duration(base, DEFAULT_READ_SECS);
        self
    }

    /// Timeout for a body of `expected_size` bytes (unknown when `None`).
    pub fn estimate(&self, expected_size: Option<u64>) -> Duration {
        let transfer = Duration::from_secs(expected_size.unwrap_or(0) / MIB);
        let timeout = self.base.max(transfer);

        let scaled = Duration::try_from_secs_f64(timeout.as_secs_f64() * self.adaptive_factor)
            .unwrap_or(self.ceiling);

        scaled.min(self.ceiling)
    }
}

fn heal_duration(value: Duration, default_secs: u64) -> Duration {
    if value.is_zero() {
        Duration::from_secs(default_secs)
    } else {
        value
    }
}

impl Default for TimeoutEstimator {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for TimeoutEstimator {
    fn from(config: &TimeoutConfig) -> Self {
        Self::new(
            Duration::from_secs(config.read_secs),
            config.adaptive_factor,
            Duration::from_secs(config.max_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> TimeoutEstimator {
        TimeoutEstimator::new(Duration::from_secs(30), 1.5, Duration::from_secs(300))
    }

    #[test]
    fn test_no_hint_scales_base() {
        assert_eq!(estimator().estimate(Some(0)), Duration::from_secs(45));
        assert_eq!(estimator().estimate(None), Duration::from_secs(45));
    }

    #[test]
    fn test_large_hint_clamped_to_ceiling() {
        // 300 MiB → 300s → ×1.5 = 450s → clamped
        assert_eq!(estimator().estimate(Some(300 * MIB)), Duration::from_secs(300));
    }

    #[test]
    fn test_transfer_estimate_beats_base() {
        // 100 MiB → 100s → ×1.5 = 150s
        assert_eq!(estimator().estimate(Some(100 * MIB)), Duration::from_secs(150));
    }

    #[test]
    fn test_partial_mebibyte_rounds_down() {
        // 40.5 MiB floors to 40s, which still beats the 30s base
        let size = 40 * MIB + MIB / 2;
        assert_eq!(estimator().estimate(Some(size)), Duration::from_secs(60));
    }

    #[test]
    fn test_factor_below_one_shrinks() {
        let e = TimeoutEstimator::new(Duration::from_secs(30), 0.5, Duration::from_secs(300));
        assert_eq!(e.estimate(None), Duration::from_secs(15));
    }

    #[test]
    fn test_zero_and_invalid_inputs_use_defaults() {
        let e = TimeoutEstimator::new(Duration::ZERO, 0.0, Duration::ZERO);
        assert_eq!(e, TimeoutEstimator::default());
        assert_eq!(e.estimate(None), Duration::from_secs(45));

        let e = TimeoutEstimator::new(Duration::from_secs(10), f64::NAN, Duration::from_secs(60));
        assert_eq!(e.adaptive_factor, 1.5);
        assert_eq!(e.estimate(None), Duration::from_secs(15));
    }

    #[test]
    fn test_with_base_ignores_zero() {
        let e = estimator().with_base(Duration::ZERO);
        assert_eq!(e.base, Duration::from_secs(30));

        let e = estimator().with_base(Duration::from_secs(2));
        assert_eq!(e.estimate(None), Duration::from_secs(3));
    }

    #[test]
    fn test_from_config() {
        let e = TimeoutEstimator::default();
        assert_eq!(e.base, Duration::from_secs(30));
        assert_eq!(e.ceiling, Duration::from_secs(300));
        assert_eq!(e.adaptive_factor, 1.5);
    }
}
