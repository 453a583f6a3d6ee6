//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (heal non-positive values, semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → converted into IngestSettings / TimeoutEstimator / RetryPolicy
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Non-positive numbers are replaced by defaults rather than rejected
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{IngestionConfig, ObservabilityConfig, RelayConfig, RetryConfig, TimeoutConfig};
