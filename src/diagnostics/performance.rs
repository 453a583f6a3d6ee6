//! Running read statistics.
//!
//! One `PerformanceMonitor` is built at startup and shared by every ingestor.
//! Updates take the write lock; snapshots take the read lock and return copies.

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

/// Aggregate over every read since the last reset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_requests: u64,
    pub total_bytes_read: u64,
    #[serde(serialize_with = "super::serialize_secs")]
    pub average_read_time: Duration,
    #[serde(serialize_with = "super::serialize_secs")]
    pub max_read_time: Duration,
    #[serde(serialize_with = "super::serialize_secs")]
    pub min_read_time: Duration,
    pub truncated_responses: u64,
    pub error_count: u64,
    pub last_reset: SystemTime,
}

impl PerformanceMetrics {
    fn empty() -> Self {
        Self {
            total_requests: 0,
            total_bytes_read: 0,
            average_read_time: Duration::ZERO,
            max_read_time: Duration::ZERO,
            min_read_time: Duration::ZERO,
            truncated_responses: 0,
            error_count: 0,
            last_reset: SystemTime::now(),
        }
    }
}

/// Derived rates over the current metrics window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EffectivenessReport {
    NoData { message: &'static str },
    Summary(EffectivenessSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivenessSummary {
    pub total_requests: u64,
    pub avg_bytes_per_request: f64,
    #[serde(serialize_with = "super::serialize_secs")]
    pub avg_read_time: Duration,
    /// Percentage of reads that hit the size ceiling.
    pub truncation_rate: f64,
    /// Percentage of reads that failed.
    pub error_rate: f64,
    #[serde(serialize_with = "super::serialize_secs")]
    pub uptime: Duration,
}

struct MonitorState {
    metrics: PerformanceMetrics,
    reset_at: Instant,
}

/// Process-wide read statistics.
pub struct PerformanceMonitor {
    state: RwLock<MonitorState>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MonitorState {
                metrics: PerformanceMetrics::empty(),
                reset_at: Instant::now(),
            }),
        }
    }

    /// Fold one finished read into the aggregate.
    pub fn record(&self, bytes_read: u64, duration: Duration, truncated: bool, failed: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let m = &mut state.metrics;

        m.total_requests += 1;
        m.total_bytes_read += bytes_read;

        if m.total_requests == 1 {
            m.average_read_time = duration;
            m.max_read_time = duration;
            m.min_read_time = duration;
        } else {
            let n = u128::from(m.total_requests);
            let total = m.average_read_time.as_nanos() * (n - 1) + duration.as_nanos();
            m.average_read_time = nanos_to_duration(total / n);

            if duration > m.max_read_time {
                m.max_read_time = duration;
            }
            if duration < m.min_read_time {
                m.min_read_time = duration;
            }
        }

        if truncated {
            m.truncated_responses += 1;
        }
        if failed {
            m.error_count += 1;
        }
    }

    /// Independent copy of the current aggregate.
    pub fn snapshot(&self) -> PerformanceMetrics {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .metrics
            .clone()
    }

    /// Zero every counter and restart the uptime clock.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.metrics = PerformanceMetrics::empty();
        state.reset_at = Instant::now();
    }

    pub fn effectiveness_report(&self) -> EffectivenessReport {
        let (m, uptime) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.metrics.clone(), state.reset_at.elapsed())
        };

        if m.total_requests == 0 {
            return EffectivenessReport::NoData {
                message: "No data available",
            };
        }

        let requests = m.total_requests as f64;
        EffectivenessReport::Summary(EffectivenessSummary {
            total_requests: m.total_requests,
            avg_bytes_per_request: m.total_bytes_read as f64 / requests,
            avg_read_time: m.average_read_time,
            truncation_rate: m.truncated_responses as f64 / requests * 100.0,
            error_rate: m.error_count as f64 / requests * 100.0,
            uptime,
        })
    }

    /// Emit the current aggregate as one log event.
    pub fn log_metrics(&self) {
        let m = self.snapshot();
        tracing::info!(
            requests = m.total_requests,
            bytes = m.total_bytes_read,
            avg_time = ?m.average_read_time,
            max_time = ?m.max_read_time,
            min_time = ?m.min_read_time,
            truncated = m.truncated_responses,
            errors = m.error_count,
            "Performance metrics"
        );
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("metrics", &self.snapshot())
            .finish()
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .unwrap_or(Duration::MAX)
}
