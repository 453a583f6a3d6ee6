//! Read diagnostics subsystem.
//!
//! # Data Flow
//! ```text
//! ResponseIngestor (every finished read)
//!     → performance.rs (running totals, averages, truncation/error rates)
//!     → timeouts.rs (bounded log of slow and failed reads, trend, recommendations)
//!
//! Operators:
//!     → snapshot() / effectiveness_report() / report()
//!     → log_metrics() / log_diagnostics() (one structured log event each)
//! ```
//!
//! # Design Decisions
//! - Explicit service objects shared via `Arc`, not process globals
//! - Each keeps its own lock; the two are never held together
//! - Poisoned locks are recovered, never propagated as panics
//! - Durations serialize as fractional seconds

use std::time::Duration;

use serde::Serializer;

pub mod performance;
pub mod timeouts;

pub use performance::{EffectivenessReport, PerformanceMetrics, PerformanceMonitor};
pub use timeouts::{DiagnosticsReport, PatternAnalysis, TimeoutDiagnostics, TimeoutEvent, Trend};

pub(crate) fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
