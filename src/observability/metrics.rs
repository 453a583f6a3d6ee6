//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ingest_reads_total` (counter): finished reads by outcome
//! - `ingest_bytes_total` (counter): bytes accepted from upstream bodies
//! - `ingest_read_duration_seconds` (histogram): wall time per read, retries included
//! - `ingest_retries_total` (counter): retries by failure kind
//! - `ingest_batch_inflight` (gauge): batch members holding an admission permit

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::FailureKind;

/// Start the Prometheus scrape endpoint. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished read. `outcome` is `"ok"` or a failure label.
pub fn record_read(outcome: &'static str, bytes: u64, elapsed: Duration) {
    metrics::counter!("ingest_reads_total", "outcome" => outcome).increment(1);
    metrics::counter!("ingest_bytes_total").increment(bytes);
    metrics::histogram!("ingest_read_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_retry(kind: FailureKind) {
    metrics::counter!("ingest_retries_total", "kind" => kind.label()).increment(1);
}

pub fn batch_task_admitted() {
    metrics::gauge!("ingest_batch_inflight").increment(1.0);
}

pub fn batch_task_released() {
    metrics::gauge!("ingest_batch_inflight").decrement(1.0);
}
