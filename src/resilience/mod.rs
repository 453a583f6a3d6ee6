//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Body read attempt:
//!     → timeouts.rs (estimate deadline from size hint)
//!     → [ingest::copy races the read against the deadline]
//!     → On transient failure: retries.rs (linear backoff via backoff.rs, retry)
//!     → On permanent failure or exhausted attempts: surface to caller
//! ```
//!
//! # Design Decisions
//! - Every body read has a deadline
//! - Only timeout-like failures are retried
//! - Deadlines are recomputed per attempt

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::TimeoutEstimator;
