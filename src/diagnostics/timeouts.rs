//! Rolling log of slow and failed reads, with trend analysis.
//!
//! # Responsibilities
//! - Keep the most recent `EVENT_CAPACITY` events (oldest evicted first)
//! - Summarise them: averages, counts per error type, recent trend
//! - Turn the summary into advisory recommendations for timeout tuning
//!
//! # Design Decisions
//! - Advisory only; nothing here feeds back into control flow
//! - Trend compares the two halves of the last `TREND_WINDOW` events
//! - Not persisted; the log starts empty on every process start

use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Maximum number of retained events.
pub const EVENT_CAPACITY: usize = 100;
/// Number of most recent events considered for the trend.
pub const TREND_WINDOW: usize = 10;

const TREND_THRESHOLD: f64 = 0.2;
const LARGE_PAYLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Event label for a read that succeeded but took longer than the base timeout.
pub const SLOW_READ: &str = "slow_read";

/// One slow or failed read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeoutEvent {
    pub timestamp: SystemTime,
    #[serde(serialize_with = "super::serialize_secs")]
    pub duration: Duration,
    pub bytes_read: u64,
    pub expected_size: Option<u64>,
    pub error_type: String,
    pub source: String,
}

/// Direction of read durations over the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

/// Summary of the retained events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PatternAnalysis {
    NoEvents { message: &'static str },
    Summary(PatternSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    pub total_events: usize,
    #[serde(serialize_with = "super::serialize_secs")]
    pub avg_duration: Duration,
    pub avg_bytes_read: u64,
    pub error_types: BTreeMap<String, usize>,
    pub trend: Trend,
    pub recent_events: usize,
}

/// Analysis plus recommendations, for operational logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    #[serde(flatten)]
    pub analysis: PatternAnalysis,
    pub recommendations: Vec<String>,
}

/// Bounded, time-ordered event log.
#[derive(Debug, Default)]
pub struct TimeoutDiagnostics {
    events: RwLock<VecDeque<TimeoutEvent>>,
}

impl TimeoutDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, evicting the oldest one when full.
    pub fn record_event(&self, event: TimeoutEvent) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        if events.len() > EVENT_CAPACITY {
            events.pop_front();
        }
    }

    /// Copy of the retained events, oldest first.
    pub fn events(&self) -> Vec<TimeoutEvent> {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn analyze_patterns(&self) -> PatternAnalysis {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        if events.is_empty() {
            return PatternAnalysis::NoEvents {
                message: "No timeout events recorded",
            };
        }

        let total = events.len();
        let mut total_nanos: u128 = 0;
        let mut total_bytes: u128 = 0;
        let mut error_types = BTreeMap::new();
        for event in events.iter() {
            total_nanos += event.duration.as_nanos();
            total_bytes += u128::from(event.bytes_read);
            *error_types.entry(event.error_type.clone()).or_insert(0) += 1;
        }

        let recent: Vec<&TimeoutEvent> = events.iter().skip(total.saturating_sub(TREND_WINDOW)).collect();

        PatternAnalysis::Summary(PatternSummary {
            total_events: total,
            avg_duration: saturating_nanos(total_nanos / total as u128),
            avg_bytes_read: u64::try_from(total_bytes / total as u128).unwrap_or(u64::MAX),
            error_types,
            trend: calculate_trend(&recent),
            recent_events: recent.len(),
        })
    }

    pub fn recommendations(&self) -> Vec<String> {
        recommendations_for(&self.analyze_patterns())
    }

    pub fn report(&self) -> DiagnosticsReport {
        let analysis = self.analyze_patterns();
        let recommendations = recommendations_for(&analysis);
        DiagnosticsReport {
            analysis,
            recommendations,
        }
    }

    /// Emit the report as one log event.
    pub fn log_diagnostics(&self) {
        let report = self.report();
        match serde_json::to_string(&report) {
            Ok(json) => tracing::info!(report = %json, "Timeout diagnostics"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize timeout diagnostics"),
        }
    }

    /// Drop every retained event.
    pub fn reset(&self) {
        self.events.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn calculate_trend(events: &[&TimeoutEvent]) -> Trend {
    if events.len() < 2 {
        return Trend::InsufficientData;
    }

    let (first, second) = events.split_at(events.len() / 2);
    let first_avg = average_secs(first);
    let second_avg = average_secs(second);

    if second_avg > first_avg * (1.0 + TREND_THRESHOLD) {
        Trend::Increasing
    } else if second_avg < first_avg * (1.0 - TREND_THRESHOLD) {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

fn average_secs(events: &[&TimeoutEvent]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    events.iter().map(|e| e.duration.as_secs_f64()).sum::<f64>() / events.len() as f64
}

fn recommendations_for(analysis: &PatternAnalysis) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let PatternAnalysis::Summary(summary) = analysis {
        if summary.avg_bytes_read > LARGE_PAYLOAD_BYTES {
            recommendations.push("Responses are large; consider raising the read timeout".to_string());
        }

        if summary.trend == Trend::Increasing {
            recommendations.push(
                "Slow reads are becoming more frequent; check upstream server and network health".to_string(),
            );
        }

        let count = |label: &str| summary.error_types.get(label).copied().unwrap_or(0);
        if count("network") > count("timeout") {
            recommendations.push("Network errors outnumber timeouts; check network configuration".to_string());
        }
    }

    if recommendations.is_empty() {
        recommendations.push("Timeout configuration looks nominal; keep monitoring".to_string());
    }

    recommendations
}

fn saturating_nanos(nanos: u128) -> Duration {
    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .unwrap_or(Duration::MAX)
}
