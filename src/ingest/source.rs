//! Upstream body sources.
//!
//! A read may be attempted more than once, so the ingestor asks a
//! [`BodySource`] for a fresh reader on every attempt instead of taking a
//! reader directly. Sources that can only be consumed once say so through
//! [`BodySource::replayable`] and are never retried.

use std::future::Future;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncRead;

/// Something that can produce an upstream body reader.
pub trait BodySource: Send + Sync {
    type Reader: AsyncRead + Send + Unpin + 'static;

    /// Open a reader positioned at the start of the body.
    fn open(&self) -> impl Future<Output = io::Result<Self::Reader>> + Send;

    /// Whether `open` may be called again after a failed attempt.
    fn replayable(&self) -> bool {
        true
    }

    /// Short description for logs and diagnostics events.
    fn label(&self) -> &str;

    /// Expected body size in bytes, if known up front.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// In-memory body.
impl BodySource for Bytes {
    type Reader = Cursor<Bytes>;

    fn open(&self) -> impl Future<Output = io::Result<Self::Reader>> + Send {
        let body = self.clone();
        async move { Ok(Cursor::new(body)) }
    }

    fn label(&self) -> &str {
        "memory"
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

/// Body stored in a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    label: String,
    size_hint: Option<u64>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            path,
            size_hint: None,
        }
    }

    /// Build a source whose size hint comes from the file's metadata.
    pub async fn with_metadata(path: impl Into<PathBuf>) -> io::Result<Self> {
        let source = Self::new(path);
        let len = tokio::fs::metadata(&source.path).await?.len();
        Ok(source.with_size_hint(len))
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BodySource for FileSource {
    type Reader = File;

    fn open(&self) -> impl Future<Output = io::Result<Self::Reader>> + Send {
        File::open(self.path.clone())
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }
}

/// Source backed by a closure that opens a new reader on each call,
/// e.g. re-issuing an upstream request.
pub struct FnSource<F> {
    label: String,
    size_hint: Option<u64>,
    open: F,
}

/// Create a [`FnSource`].
pub fn from_fn<F, Fut, R>(label: impl Into<String>, open: F) -> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = io::Result<R>> + Send,
    R: AsyncRead + Send + Unpin + 'static,
{
    FnSource {
        label: label.into(),
        size_hint: None,
        open,
    }
}

impl<F> FnSource<F> {
    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }
}

impl<F, Fut, R> BodySource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = io::Result<R>> + Send,
    R: AsyncRead + Send + Unpin + 'static,
{
    type Reader = R;

    fn open(&self) -> impl Future<Output = io::Result<Self::Reader>> + Send {
        (self.open)()
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }
}

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSource")
            .field("label", &self.label)
            .field("size_hint", &self.size_hint)
            .finish()
    }
}

/// A reader that can be handed out exactly once, such as a live
/// response stream. Never retried.
pub struct OnceSource<R> {
    label: String,
    size_hint: Option<u64>,
    reader: Mutex<Option<R>>,
}

impl<R> OnceSource<R> {
    pub fn new(label: impl Into<String>, reader: R) -> Self {
        Self {
            label: label.into(),
            size_hint: None,
            reader: Mutex::new(Some(reader)),
        }
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }
}

impl<R> BodySource for OnceSource<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    type Reader = R;

    fn open(&self) -> impl Future<Output = io::Result<Self::Reader>> + Send {
        let taken = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        async move { taken.ok_or_else(|| io::Error::other("body source already consumed")) }
    }

    fn replayable(&self) -> bool {
        false
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }
}

impl<R> std::fmt::Debug for OnceSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceSource")
            .field("label", &self.label)
            .field("size_hint", &self.size_hint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    async fn read_all<S: BodySource>(source: &S) -> io::Result<Vec<u8>> {
        let mut reader = source.open().await?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn test_bytes_source_reopens() {
        let source = Bytes::from_static(b"payload");
        assert_eq!(read_all(&source).await.unwrap(), b"payload");
        assert_eq!(read_all(&source).await.unwrap(), b"payload");
        assert!(source.replayable());
        assert_eq!(source.size_hint(), Some(7));
    }

    #[tokio::test]
    async fn test_once_source_consumed_after_first_open() {
        let source = OnceSource::new("stream", Cursor::new(b"abc".to_vec()));
        assert!(!source.replayable());
        assert_eq!(read_all(&source).await.unwrap(), b"abc");

        let err = read_all(&source).await.unwrap_err();
        assert!(err.to_string().contains("already consumed"));
    }

    #[tokio::test]
    async fn test_fn_source_calls_closure_per_open() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = opens.clone();
        let source = from_fn("fn", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, io::Error>(Cursor::new(vec![n as u8])) }
        })
        .with_size_hint(1);

        assert_eq!(read_all(&source).await.unwrap(), vec![0]);
        assert_eq!(read_all(&source).await.unwrap(), vec![1]);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(source.label(), "fn");
        assert_eq!(source.size_hint(), Some(1));
    }

    #[tokio::test]
    async fn test_file_source_reads_metadata_size() {
        let path = std::env::temp_dir().join(format!("relay-ingest-source-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"{\"ok\":true}").await.unwrap();

        let source = FileSource::with_metadata(&path).await.unwrap();
        assert_eq!(source.size_hint(), Some(11));
        assert_eq!(read_all(&source).await.unwrap(), b"{\"ok\":true}");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_fails_to_open() {
        let source = FileSource::new("/nonexistent/relay-ingest/body.json");
        let err = read_all(&source).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
