//! Resilient body ingestion for an AI-API relay.
//!
//! Reads large, slow or stalled upstream response bodies under a bounded
//! memory budget and an adaptive time budget, retries transient failures,
//! and keeps running performance and timeout diagnostics.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod observability;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use diagnostics::{PerformanceMonitor, TimeoutDiagnostics};
pub use error::{IngestError, IngestResult};
pub use ingest::{BodySource, ResponseIngestor, TaskAdaptor};
