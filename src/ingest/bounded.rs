//! Size-bounded, buffered body reader.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf, Take};

/// Yields at most `ceiling` bytes of the wrapped reader, buffered in
/// chunks of `buffer_size`.
///
/// Reaching the ceiling ends the stream like a normal EOF; callers detect
/// truncation with [`reached_ceiling`].
#[derive(Debug)]
pub struct BoundedReader<R> {
    inner: Take<BufReader<R>>,
    ceiling: u64,
}

/// A payload of exactly the ceiling may have been cut short.
pub fn reached_ceiling(len: u64, ceiling: u64) -> bool {
    len >= ceiling
}

impl<R: AsyncRead + Unpin> BoundedReader<R> {
    pub fn new(reader: R, ceiling: u64, buffer_size: usize) -> Self {
        let buffered = BufReader::with_capacity(buffer_size.max(1), reader);
        Self {
            inner: buffered.take(ceiling),
            ceiling,
        }
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Bytes still allowed before the ceiling.
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for BoundedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}
