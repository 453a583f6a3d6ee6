//! Failure taxonomy for body ingestion.
//!
//! Every failure is tagged with its kind where it originates (deadline expiry,
//! transport error, size ceiling, adaptor). Retry decisions and diagnostics
//! labels are derived from the tag, never from the message text.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Error returned by a task adaptor while decoding a body.
pub type AdaptorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while ingesting an upstream body.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload reached the configured size ceiling.
    #[error("response body too large, exceeds {limit} bytes")]
    SizeExceeded { limit: u64 },

    /// The read did not finish before its deadline.
    #[error("read timeout after {after:?} (expected size: {} bytes)", .expected_size.unwrap_or(0))]
    Timeout {
        after: Duration,
        expected_size: Option<u64>,
    },

    /// The upstream source failed while opening or reading.
    #[error("failed to read response: {0}")]
    Transport(#[source] io::Error),

    /// Transient failures persisted for every allowed attempt.
    #[error("operation failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<IngestError>,
    },

    /// The task adaptor rejected the body.
    #[error("task adaptor failed: {0}")]
    Adaptor(#[source] AdaptorError),

    /// A batch member failed; `index` is its position in the input.
    #[error("error parsing response {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<IngestError>,
    },

    /// A spawned ingestion task panicked or was cancelled.
    #[error("ingest task failed: {0}")]
    Task(String),
}

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Coarse failure classes, used as diagnostics labels and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    SizeExceeded,
    Timeout,
    Transport,
    Adaptor,
    Internal,
}

impl FailureKind {
    /// Stable label for logs, metrics and diagnostics events.
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::SizeExceeded => "size_exceeded",
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "network",
            FailureKind::Adaptor => "adaptor",
            FailureKind::Internal => "internal",
        }
    }
}

impl IngestError {
    /// Classify this error.
    ///
    /// Wrappers (`RetriesExhausted`, `Batch`) report the kind of the error they carry.
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::SizeExceeded { .. } => FailureKind::SizeExceeded,
            IngestError::Timeout { .. } => FailureKind::Timeout,
            IngestError::Transport(e) if e.kind() == io::ErrorKind::TimedOut => FailureKind::Timeout,
            IngestError::Transport(_) => FailureKind::Transport,
            IngestError::RetriesExhausted { last, .. } => last.kind(),
            IngestError::Adaptor(_) => FailureKind::Adaptor,
            IngestError::Batch { source, .. } => source.kind(),
            IngestError::Task(_) => FailureKind::Internal,
        }
    }

    /// Returns true if the failure may succeed when the read is attempted again.
    ///
    /// Only direct timeouts qualify; an exhausted retry is final.
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::Timeout { .. } => true,
            IngestError::Transport(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        IngestError::Transport(err)
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = IngestError::Timeout {
            after: Duration::from_secs(45),
            expected_size: None,
        };
        assert!(timeout.is_transient());
        assert_eq!(timeout.kind(), FailureKind::Timeout);

        let stalled = IngestError::Transport(io::Error::new(io::ErrorKind::TimedOut, "socket stalled"));
        assert!(stalled.is_transient());
        assert_eq!(stalled.kind().label(), "timeout");

        let reset = IngestError::Transport(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        assert!(!reset.is_transient());
        assert_eq!(reset.kind().label(), "network");

        assert!(!IngestError::SizeExceeded { limit: 10 }.is_transient());
    }

    #[test]
    fn test_wrappers_keep_inner_kind() {
        let exhausted = IngestError::RetriesExhausted {
            attempts: 3,
            last: Box::new(IngestError::Timeout {
                after: Duration::from_secs(1),
                expected_size: Some(10),
            }),
        };
        assert!(!exhausted.is_transient());
        assert_eq!(exhausted.kind(), FailureKind::Timeout);
        assert!(exhausted.to_string().contains("after 3 attempts"));

        let batch = IngestError::Batch {
            index: 4,
            source: Box::new(IngestError::SizeExceeded { limit: 1024 }),
        };
        assert_eq!(batch.kind(), FailureKind::SizeExceeded);
        assert_eq!(
            batch.to_string(),
            "error parsing response 4: response body too large, exceeds 1024 bytes"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = IngestError::Timeout {
            after: Duration::from_secs(45),
            expected_size: Some(2048),
        };
        assert_eq!(err.to_string(), "read timeout after 45s (expected size: 2048 bytes)");
    }
}
