//! Response ingestor.
//!
//! # Responsibilities
//! - Read one upstream body under the size ceiling and an adaptive deadline
//! - Retry timeouts on re-openable sources
//! - Feed every finished read into the performance monitor and slow or
//!   failed reads into the timeout diagnostics log
//! - Decode bodies through a caller-supplied [`TaskAdaptor`]
//! - Parse batches with bounded fan-out, results aligned with input order
//!
//! # Design Decisions
//! - The ingestor is cheap to clone; monitor and diagnostics are shared `Arc`s
//! - A payload of exactly the ceiling is treated as oversized and never retried
//! - Adaptor failures are final; the body is never re-read for them
//! - Every read runs inside an `ingest` span carrying a UUID v4 `ingest_id`

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::schema::{DEFAULT_BUFFER_SIZE, DEFAULT_CONCURRENCY, DEFAULT_MAX_RESPONSE_SIZE};
use crate::config::{IngestionConfig, RelayConfig};
use crate::diagnostics::performance::PerformanceMonitor;
use crate::diagnostics::timeouts::{TimeoutDiagnostics, TimeoutEvent, SLOW_READ};
use crate::error::{FailureKind, IngestError, IngestResult};
use crate::ingest::adaptor::TaskAdaptor;
use crate::ingest::bounded::{reached_ceiling, BoundedReader};
use crate::ingest::copy::{cancellable_copy, direct_read, CopyBudget};
use crate::ingest::source::BodySource;
use crate::observability::metrics;
use crate::resilience::{RetryPolicy, TimeoutEstimator};

/// Size, buffering and fan-out settings for one ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Hard ceiling on bytes read per body.
    pub size_ceiling: u64,
    /// Read-ahead buffer and conduit capacity.
    pub buffer_size: usize,
    /// Maximum batch members in flight.
    pub concurrency: usize,
    /// Copy through the copier/collector pair; read directly when false.
    pub enable_streaming: bool,
    /// Batch members run one at a time when false.
    pub enable_concurrency: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self::from(&IngestionConfig::default())
    }
}

impl IngestSettings {
    /// Replace zero sizes and counts with their defaults.
    pub fn healed(self) -> Self {
        Self {
            size_ceiling: if self.size_ceiling == 0 {
                DEFAULT_MAX_RESPONSE_SIZE
            } else {
                self.size_ceiling
            },
            buffer_size: if self.buffer_size == 0 {
                DEFAULT_BUFFER_SIZE
            } else {
                self.buffer_size
            },
            concurrency: if self.concurrency == 0 {
                DEFAULT_CONCURRENCY
            } else {
                self.concurrency
            },
            ..self
        }
    }
}

impl From<&IngestionConfig> for IngestSettings {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            size_ceiling: config.max_response_size,
            buffer_size: config.buffer_size,
            concurrency: config.concurrency,
            enable_streaming: config.enable_streaming,
            enable_concurrency: config.enable_concurrency,
        }
    }
}

/// A finished read.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub payload: Bytes,
    /// Payload length reached the ceiling; the body may be incomplete.
    pub truncated: bool,
    /// Wall time across every attempt, backoff included.
    pub elapsed: Duration,
}

/// Reads upstream bodies and hands them to task adaptors.
#[derive(Debug, Clone)]
pub struct ResponseIngestor {
    settings: IngestSettings,
    estimator: TimeoutEstimator,
    retry: RetryPolicy,
    monitor: Arc<PerformanceMonitor>,
    diagnostics: Arc<TimeoutDiagnostics>,
}

impl ResponseIngestor {
    pub fn new(
        settings: IngestSettings,
        estimator: TimeoutEstimator,
        retry: RetryPolicy,
        monitor: Arc<PerformanceMonitor>,
        diagnostics: Arc<TimeoutDiagnostics>,
    ) -> Self {
        Self {
            settings: settings.healed(),
            estimator,
            retry,
            monitor,
            diagnostics,
        }
    }

    pub fn from_config(
        config: &RelayConfig,
        monitor: Arc<PerformanceMonitor>,
        diagnostics: Arc<TimeoutDiagnostics>,
    ) -> Self {
        Self::new(
            IngestSettings::from(&config.ingestion),
            TimeoutEstimator::from(&config.timeouts),
            RetryPolicy::from(&config.retries),
            monitor,
            diagnostics,
        )
    }

    /// Setters treat zero as "use the default".
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.settings.size_ceiling = size;
        self.settings = self.settings.healed();
        self
    }

    pub fn with_base_timeout(mut self, timeout: Duration) -> Self {
        self.estimator = self.estimator.with_base(timeout);
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.settings.buffer_size = size;
        self.settings = self.settings.healed();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.settings.concurrency = concurrency;
        self.settings = self.settings.healed();
        self
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn diagnostics(&self) -> &Arc<TimeoutDiagnostics> {
        &self.diagnostics
    }

    /// Read a body, rejecting payloads that reached the size ceiling.
    pub async fn read<S: BodySource>(&self, source: &S, size_hint: Option<u64>) -> IngestResult<Bytes> {
        let outcome = self.read_outcome(source, size_hint).await?;
        if outcome.truncated {
            return Err(IngestError::SizeExceeded {
                limit: self.settings.size_ceiling,
            });
        }
        Ok(outcome.payload)
    }

    /// Read a body and report truncation instead of failing on it.
    ///
    /// `size_hint` overrides [`BodySource::size_hint`] when given.
    pub async fn read_outcome<S: BodySource>(
        &self,
        source: &S,
        size_hint: Option<u64>,
    ) -> IngestResult<ReadOutcome> {
        let ingest_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest", %ingest_id, source = source.label());
        self.read_with_retries(source, size_hint.or_else(|| source.size_hint()))
            .instrument(span)
            .await
    }

    /// Read a body and decode it with `adaptor`.
    pub async fn parse<S, A>(&self, source: &S, size_hint: Option<u64>, adaptor: &A) -> IngestResult<A::Output>
    where
        S: BodySource,
        A: TaskAdaptor + ?Sized,
    {
        let body = self.read(source, size_hint).await?;
        adaptor.parse_task_result(&body).map_err(|e| {
            tracing::warn!(source = source.label(), bytes = body.len(), error = %e, "Task adaptor rejected body");
            IngestError::Adaptor(e)
        })
    }

    /// Parse every source, at most `concurrency` at a time.
    ///
    /// Results are in input order. Every member runs to completion; if any
    /// failed, the failure with the lowest index is returned.
    pub async fn concurrent_parse<S, A>(&self, sources: Vec<S>, adaptor: Arc<A>) -> IngestResult<Vec<A::Output>>
    where
        S: BodySource + 'static,
        A: TaskAdaptor + 'static,
    {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let permits = if self.settings.enable_concurrency {
            self.settings.concurrency.clamp(1, sources.len())
        } else {
            1
        };
        let gate = Arc::new(Semaphore::new(permits));

        tracing::debug!(members = sources.len(), permits, "Starting batch parse");

        let handles: Vec<JoinHandle<IngestResult<A::Output>>> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                let ingestor = self.clone();
                let gate = gate.clone();
                let adaptor = adaptor.clone();
                let span = tracing::debug_span!("batch_member", index);

                tokio::spawn(
                    async move {
                        let _permit = gate
                            .acquire_owned()
                            .await
                            .map_err(|e| IngestError::Task(e.to_string()))?;
                        metrics::batch_task_admitted();
                        let result = ingestor.parse(&source, None, adaptor.as_ref()).await;
                        metrics::batch_task_released();
                        result
                    }
                    .instrument(span),
                )
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await.map_err(IngestError::from).and_then(|r| r) {
                Ok(output) => results.push(output),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Batch member failed");
                    if first_error.is_none() {
                        first_error = Some(IngestError::Batch {
                            index,
                            source: Box::new(e),
                        });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    async fn read_with_retries<S: BodySource>(
        &self,
        source: &S,
        expected_size: Option<u64>,
    ) -> IngestResult<ReadOutcome> {
        let policy = if source.replayable() {
            self.retry
        } else {
            RetryPolicy::single_attempt()
        };

        let started = Instant::now();
        let result = policy
            .run(move |attempt| self.attempt(source, expected_size, attempt))
            .await;
        let elapsed = started.elapsed();

        match result {
            Ok(payload) => {
                let len = payload.len() as u64;
                let truncated = reached_ceiling(len, self.settings.size_ceiling);

                self.monitor.record(len, elapsed, truncated, false);
                metrics::record_read(if truncated { "truncated" } else { "ok" }, len, elapsed);

                if truncated {
                    tracing::warn!(
                        bytes = len,
                        limit = self.settings.size_ceiling,
                        "Body reached size ceiling"
                    );
                }

                if elapsed > self.estimator.base {
                    tracing::warn!(elapsed = ?elapsed, bytes = len, "Slow body read");
                    self.record_event(source, elapsed, len, expected_size, SLOW_READ);
                } else {
                    tracing::debug!(elapsed = ?elapsed, bytes = len, "Body read");
                }

                Ok(ReadOutcome {
                    payload: Bytes::from(payload),
                    truncated,
                    elapsed,
                })
            }
            Err(e) => {
                let kind = e.kind();
                self.monitor.record(0, elapsed, false, true);
                metrics::record_read(kind.label(), 0, elapsed);
                tracing::error!(elapsed = ?elapsed, error = %e, "Body read failed");

                if matches!(kind, FailureKind::Timeout | FailureKind::Transport) {
                    self.record_event(source, elapsed, 0, expected_size, kind.label());
                }

                Err(e)
            }
        }
    }

    async fn attempt<S: BodySource>(
        &self,
        source: &S,
        expected_size: Option<u64>,
        attempt: u32,
    ) -> IngestResult<Vec<u8>> {
        let timeout = self.estimator.estimate(expected_size);
        let budget = CopyBudget::starting_now(timeout, expected_size, self.settings.buffer_size);

        tracing::debug!(attempt, timeout = ?timeout, expected_size = ?expected_size, "Reading body");

        let reader = match timeout_at(budget.deadline, source.open()).await {
            Ok(opened) => opened?,
            Err(_) => return Err(budget.expired()),
        };
        let bounded = BoundedReader::new(reader, self.settings.size_ceiling, self.settings.buffer_size);

        if self.settings.enable_streaming {
            cancellable_copy(bounded, budget).await
        } else {
            direct_read(bounded, budget).await
        }
    }

    fn record_event<S: BodySource>(
        &self,
        source: &S,
        duration: Duration,
        bytes_read: u64,
        expected_size: Option<u64>,
        error_type: &str,
    ) {
        self.diagnostics.record_event(TimeoutEvent {
            timestamp: SystemTime::now(),
            duration,
            bytes_read,
            expected_size,
            error_type: error_type.to_string(),
            source: source.label().to_string(),
        });
    }
}
