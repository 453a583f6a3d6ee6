//! Deadline-bounded body copy.
//!
//! # Responsibilities
//! - Drain a bounded reader into memory before a deadline
//! - Report expiry as `IngestError::Timeout` as soon as the deadline passes
//! - Surface read errors from the upstream side even when the buffer side
//!   finished cleanly
//!
//! # Design Decisions
//! - Two tasks joined by an in-memory pipe: the copier reads upstream and
//!   writes into the pipe, the collector reads the pipe into a `Vec`
//! - Pipe capacity equals the read buffer size, so at most one extra buffer
//!   is in flight between the tasks
//! - On expiry the collector is aborted and the copier is detached
//!
//! # Cancellation
//! Cancellation is best-effort. A copier blocked on a stalled upstream read
//! cannot be interrupted; it stops at its next write into the closed pipe or
//! when the upstream ends. Callers get their `Timeout` immediately either way.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};

use crate::error::{IngestError, IngestResult};
use crate::ingest::bounded::BoundedReader;

/// Deadline and sizing for one copy.
#[derive(Debug, Clone, Copy)]
pub struct CopyBudget {
    pub deadline: Instant,
    /// Timeout the deadline was derived from, reported on expiry.
    pub timeout: Duration,
    pub expected_size: Option<u64>,
    pub conduit_capacity: usize,
}

impl CopyBudget {
    pub fn starting_now(timeout: Duration, expected_size: Option<u64>, conduit_capacity: usize) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
            expected_size,
            conduit_capacity,
        }
    }

    /// The failure reported when `deadline` passes.
    pub fn expired(&self) -> IngestError {
        IngestError::Timeout {
            after: self.timeout,
            expected_size: self.expected_size,
        }
    }
}

/// Copy `reader` into memory through a copier/collector task pair.
pub async fn cancellable_copy<R>(reader: BoundedReader<R>, budget: CopyBudget) -> IngestResult<Vec<u8>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (mut pipe_in, mut pipe_out) = tokio::io::duplex(budget.conduit_capacity.max(1));

    let copier = tokio::spawn(async move {
        let mut reader = reader;
        // `pipe_in` drops when the task ends, which closes the pipe.
        tokio::io::copy(&mut reader, &mut pipe_in).await
    });

    let collector = tokio::spawn(async move {
        let mut buf = Vec::new();
        pipe_out.read_to_end(&mut buf).await.map(|_| buf)
    });
    let collector_abort = collector.abort_handle();

    let joined = async move {
        let collected = collector.await?;
        let copied = copier.await?;
        copied?;
        Ok::<_, IngestError>(collected?)
    };

    match timeout_at(budget.deadline, joined).await {
        Ok(result) => result,
        Err(_) => {
            collector_abort.abort();
            tracing::debug!(timeout = ?budget.timeout, "Copy deadline expired, collector aborted");
            Err(budget.expired())
        }
    }
}

/// Read `reader` into memory on the current task, under the same deadline.
pub async fn direct_read<R>(mut reader: BoundedReader<R>, budget: CopyBudget) -> IngestResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    match timeout_at(budget.deadline, reader.read_to_end(&mut buf)).await {
        Ok(Ok(_)) => Ok(buf),
        Ok(Err(e)) => Err(IngestError::Transport(e)),
        Err(_) => Err(budget.expired()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Never yields data and never ends.
    struct Stalled;

    impl AsyncRead for Stalled {
        fn poll_read(self: Pin<&mut Self>, _: &mut Context<'_>, _: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    /// Yields `prefix`, then fails.
    struct FailsAfter {
        prefix: Option<Vec<u8>>,
    }

    impl AsyncRead for FailsAfter {
        fn poll_read(mut self: Pin<&mut Self>, _: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            match self.prefix.take() {
                Some(mut prefix) => {
                    let n = prefix.len().min(buf.remaining());
                    buf.put_slice(&prefix[..n]);
                    prefix.drain(..n);
                    if !prefix.is_empty() {
                        self.prefix = Some(prefix);
                    }
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream reset"))),
            }
        }
    }

    fn budget(timeout: Duration) -> CopyBudget {
        CopyBudget::starting_now(timeout, Some(1024), 16)
    }

    #[tokio::test]
    async fn test_copy_small_body() {
        let reader = BoundedReader::new(Cursor::new(b"hello world".to_vec()), 1024, 4);
        let out = cancellable_copy(reader, budget(Duration::from_secs(5))).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_copy_body_larger_than_conduit() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reader = BoundedReader::new(Cursor::new(data.clone()), 1 << 20, 64);
        let out = cancellable_copy(reader, budget(Duration::from_secs(5))).await.unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_copy_respects_ceiling() {
        let reader = BoundedReader::new(Cursor::new(vec![1u8; 500]), 100, 16);
        let out = cancellable_copy(reader, budget(Duration::from_secs(5))).await.unwrap();
        assert_eq!(out.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_copy_times_out_at_deadline() {
        let reader = BoundedReader::new(Stalled, 1024, 16);
        let start = Instant::now();

        let err = cancellable_copy(reader, budget(Duration::from_secs(2))).await.unwrap_err();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3), "elapsed {:?}", elapsed);
        match err {
            IngestError::Timeout { after, expected_size } => {
                assert_eq!(after, Duration::from_secs(2));
                assert_eq!(expected_size, Some(1024));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_copier_error_is_surfaced() {
        let reader = BoundedReader::new(
            FailsAfter {
                prefix: Some(b"partial".to_vec()),
            },
            1024,
            4,
        );

        let err = cancellable_copy(reader, budget(Duration::from_secs(5))).await.unwrap_err();
        match err {
            IngestError::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_direct_read() {
        let reader = BoundedReader::new(Cursor::new(b"direct".to_vec()), 1024, 4);
        let out = direct_read(reader, budget(Duration::from_secs(5))).await.unwrap();
        assert_eq!(out, b"direct");
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_read_times_out() {
        let reader = BoundedReader::new(Stalled, 1024, 16);
        let err = direct_read(reader, budget(Duration::from_secs(1))).await.unwrap_err();
        assert!(matches!(err, IngestError::Timeout { .. }));
    }
}
