//! Linear backoff between retries.

use std::time::Duration;

/// Delay before retry number `retry` (1-based): `retry` units.
pub fn calculate_backoff(retry: u32, unit: Duration) -> Duration {
    unit.saturating_mul(retry)
}
