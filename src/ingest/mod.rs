//! Body ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! BodySource (source.rs)
//!     → open() a fresh reader per attempt
//!     → bounded.rs (read-ahead buffer + hard size ceiling)
//!     → copy.rs (copier/collector pair raced against the deadline)
//!     → ingestor.rs (retries, monitor + diagnostics bookkeeping)
//!     → adaptor.rs (bytes → task result)
//! ```
//!
//! # Design Decisions
//! - Memory per read is bounded by the size ceiling plus one conduit buffer
//! - Sources, not readers, are the unit of retry
//! - Decoding is delegated; the ingestor never interprets body bytes

pub mod adaptor;
pub mod bounded;
pub mod copy;
pub mod ingestor;
pub mod source;

pub use adaptor::{JsonAdaptor, TaskAdaptor};
pub use bounded::BoundedReader;
pub use ingestor::{IngestSettings, ReadOutcome, ResponseIngestor};
pub use source::{from_fn, BodySource, FileSource, FnSource, OnceSource};
