//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for body ingestion.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// 20 MiB.
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;
/// 64 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
pub const DEFAULT_CONCURRENCY: usize = 2;
pub const DEFAULT_READ_SECS: u64 = 30;
pub const DEFAULT_MAX_SECS: u64 = 5 * 60;
pub const DEFAULT_ADAPTIVE_FACTOR: f64 = 1.5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Root configuration for the ingestion layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Body size, buffering and fan-out settings.
    pub ingestion: IngestionConfig,

    /// Adaptive read timeout settings.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Body ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Hard ceiling on bytes read from one upstream body.
    pub max_response_size: u64,

    /// Read-ahead buffer and conduit capacity in bytes.
    pub buffer_size: usize,

    /// Maximum number of bodies parsed at once in a batch.
    pub concurrency: usize,

    /// Copy through the two-task conduit instead of reading directly.
    pub enable_streaming: bool,

    /// Fan batch reads out over `concurrency` tasks; one at a time when false.
    pub enable_concurrency: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            enable_streaming: true,
            enable_concurrency: true,
        }
    }
}

/// Timeout configuration for body reads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Base read timeout in seconds. Reads slower than this are logged as slow.
    pub read_secs: u64,

    /// Upper bound on any computed read timeout, in seconds.
    pub max_secs: u64,

    /// Multiplier applied to the size-based estimate.
    pub adaptive_factor: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: DEFAULT_READ_SECS,
            max_secs: DEFAULT_MAX_SECS,
            adaptive_factor: DEFAULT_ADAPTIVE_FACTOR,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per read, including the first.
    pub max_attempts: u32,

    /// Linear backoff unit in milliseconds; retry `n` waits `n` units.
    pub backoff_unit_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
