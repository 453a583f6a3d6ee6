//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! ingest + resilience produce:
//!     → logging.rs (structured log events, one span per ingestion)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every ingestion span carries an `ingest_id` (UUID v4)
//! - Metric calls are no-ops until a recorder is installed
//! - Running aggregates (averages, trends) live in `crate::diagnostics`, not here

pub mod logging;
pub mod metrics;
