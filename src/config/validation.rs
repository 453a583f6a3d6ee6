//! Configuration validation.
//!
//! # Responsibilities
//! - Replace non-positive numeric settings with their defaults (self-healing)
//! - Reject settings that cannot be healed (unparseable metrics address)
//!
//! # Design Decisions
//! - Healing never fails; it reports what it replaced so the loader can log it
//! - Validation returns all errors, not just the first

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{
    RelayConfig, DEFAULT_ADAPTIVE_FACTOR, DEFAULT_BACKOFF_UNIT_MS, DEFAULT_BUFFER_SIZE,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_MAX_SECS,
    DEFAULT_READ_SECS,
};

/// A semantic error that healing cannot fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("log level must not be empty")]
    EmptyLogLevel,
}

/// A setting that was replaced by its default.
#[derive(Debug, Clone, PartialEq)]
pub struct HealedField {
    pub field: &'static str,
    pub default: String,
}

fn heal<T: PartialOrd + Copy + ToString>(
    value: &mut T,
    zero: T,
    default: T,
    field: &'static str,
    healed: &mut Vec<HealedField>,
) {
    if *value <= zero {
        *value = default;
        healed.push(HealedField {
            field,
            default: default.to_string(),
        });
    }
}

/// Replace every non-positive numeric setting with its default.
pub fn heal_config(config: &mut RelayConfig) -> Vec<HealedField> {
    let mut healed = Vec::new();

    let ingestion = &mut config.ingestion;
    heal(&mut ingestion.max_response_size, 0, DEFAULT_MAX_RESPONSE_SIZE, "ingestion.max_response_size", &mut healed);
    heal(&mut ingestion.buffer_size, 0, DEFAULT_BUFFER_SIZE, "ingestion.buffer_size", &mut healed);
    heal(&mut ingestion.concurrency, 0, DEFAULT_CONCURRENCY, "ingestion.concurrency", &mut healed);

    let timeouts = &mut config.timeouts;
    heal(&mut timeouts.read_secs, 0, DEFAULT_READ_SECS, "timeouts.read_secs", &mut healed);
    heal(&mut timeouts.max_secs, 0, DEFAULT_MAX_SECS, "timeouts.max_secs", &mut healed);
    if !timeouts.adaptive_factor.is_finite() {
        timeouts.adaptive_factor = 0.0;
    }
    heal(&mut timeouts.adaptive_factor, 0.0, DEFAULT_ADAPTIVE_FACTOR, "timeouts.adaptive_factor", &mut healed);

    let retries = &mut config.retries;
    heal(&mut retries.max_attempts, 0, DEFAULT_MAX_ATTEMPTS, "retries.max_attempts", &mut healed);
    heal(&mut retries.backoff_unit_ms, 0, DEFAULT_BACKOFF_UNIT_MS, "retries.backoff_unit_ms", &mut healed);

    healed
}

/// Check the settings healing cannot repair.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }
    if observability.log_level.trim().is_empty() {
        errors.push(ValidationError::EmptyLogLevel);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
