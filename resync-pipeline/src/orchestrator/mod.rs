//! Orchestrator module for the resync pipeline.
//!
//! Coordinates the source, processor, loader and writer components and
//! streams per-record outcomes to the caller.

mod events;
mod stream;

pub use events::{RecordFailure, SyncEvent, SyncState, SyncSummary, Termination};
pub use stream::{SyncCanceller, SyncListeners, SyncStream};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{PipelineError, RecordError};
use crate::loader::{IndexSubmitter, RetryPolicy, DEFAULT_SUBMIT_TIMEOUT};
use crate::processor::RecordTransformer;
use crate::source::{RecordSource, DEFAULT_PULL_TIMEOUT};
use crate::writer::{PersistenceWriter, DEFAULT_SAVE_TIMEOUT};
use resync_repository::{RecordStore, SearchEngineClient};
use resync_shared::{IndexableDocument, Record, RecordFilter};

/// Configuration for a synchronization run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Save each indexed record back to the store.
    pub save_on_synchronize: bool,
    /// Maximum number of records in flight.
    pub concurrency: usize,
    /// Size of the event channel buffer.
    pub channel_buffer_size: usize,
    /// Retry policy for index requests.
    pub retry: RetryPolicy,
    /// Time allowed for the cursor to yield each record.
    pub pull_timeout: Duration,
    pub submit_timeout: Duration,
    pub save_timeout: Duration,
    /// Refresh the index before the close event so results are searchable.
    pub refresh_on_close: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            save_on_synchronize: true,
            concurrency: 4,
            channel_buffer_size: 1000,
            retry: RetryPolicy::default(),
            pull_timeout: DEFAULT_PULL_TIMEOUT,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            save_timeout: DEFAULT_SAVE_TIMEOUT,
            refresh_on_close: false,
        }
    }
}

impl SyncConfig {
    pub fn save_on_synchronize(mut self, enabled: bool) -> Self {
        self.save_on_synchronize = enabled;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = timeout;
        self
    }

    pub fn submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout = timeout;
        self
    }

    pub fn refresh_on_close(mut self, enabled: bool) -> Self {
        self.refresh_on_close = enabled;
        self
    }

    /// Reject limits and timeouts a run cannot make progress with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::config("concurrency must be at least 1"));
        }
        if self.channel_buffer_size == 0 {
            return Err(PipelineError::config("channel_buffer_size must be at least 1"));
        }
        for (name, timeout) in [
            ("pull_timeout", self.pull_timeout),
            ("submit_timeout", self.submit_timeout),
            ("save_timeout", self.save_timeout),
        ] {
            if timeout.is_zero() {
                return Err(PipelineError::config(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

/// Entry point for full-collection resynchronization.
///
/// The synchronizer:
/// - Pulls records lazily from the store, one per free worker slot
/// - Transforms, indexes and optionally saves each record
/// - Streams one outcome event per record followed by a close event
/// - Stops pulling on cancellation or source failure, draining in-flight work
#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn SearchEngineClient>,
    transformer: Arc<RecordTransformer>,
}

impl Synchronizer {
    /// Create a new synchronizer over the given collaborators.
    pub fn new(
        store: Arc<dyn RecordStore>,
        client: Arc<dyn SearchEngineClient>,
        transformer: RecordTransformer,
    ) -> Self {
        Self {
            store,
            client,
            transformer: Arc::new(transformer),
        }
    }

    /// Synchronize every record with the default configuration.
    pub fn synchronize_all(&self) -> SyncStream {
        self.synchronize(RecordFilter::all(), SyncConfig::default())
    }

    /// Start a run over the records matching `filter`.
    ///
    /// The run executes on its own task and starts immediately; events
    /// buffer up to `channel_buffer_size` until the stream is polled. Must
    /// be called from within a Tokio runtime. Zero limits run as 1; use
    /// [`SyncConfig::validate`] to reject them instead.
    pub fn synchronize(&self, filter: RecordFilter, config: SyncConfig) -> SyncStream {
        let (events_tx, events_rx) = mpsc::channel(config.channel_buffer_size.max(1));
        let (state_tx, state_rx) = watch::channel(SyncState::Idle);
        let (shutdown_tx, _) = broadcast::channel(1);

        let submitter =
            IndexSubmitter::with_policy(self.client.clone(), config.retry, config.submit_timeout);
        // Without saving there is no writer, so the store's write path never runs.
        let writer = config
            .save_on_synchronize
            .then(|| PersistenceWriter::with_timeout(self.store.clone(), config.save_timeout));

        let run = SyncRun {
            store: self.store.clone(),
            client: self.client.clone(),
            worker: Arc::new(Worker {
                transformer: self.transformer.clone(),
                submitter,
                writer,
            }),
            filter,
            config,
            events_tx,
            state_tx,
            shutdown_rx: shutdown_tx.subscribe(),
        };
        tokio::spawn(run.run());

        SyncStream::new(ReceiverStream::new(events_rx), state_rx, shutdown_tx)
    }
}

/// Per-record stages shared by every worker of a run.
struct Worker {
    transformer: Arc<RecordTransformer>,
    submitter: IndexSubmitter,
    writer: Option<PersistenceWriter>,
}

/// Result of one record's trip through the stages.
struct Processed {
    record_id: Uuid,
    outcome: Result<IndexableDocument, RecordError>,
    saved: bool,
}

impl Worker {
    async fn process(&self, record: Record) -> Processed {
        let record_id = record.id;
        let mut saved = false;
        let outcome = self.stages(record, &mut saved).await;
        Processed {
            record_id,
            outcome,
            saved,
        }
    }

    async fn stages(
        &self,
        record: Record,
        saved: &mut bool,
    ) -> Result<IndexableDocument, RecordError> {
        debug!(record_id = %record.id, "Transforming record");
        let document = self.transformer.transform(&record)?;

        debug!(record_id = %record.id, "Submitting document");
        let ack = self.submitter.submit(&document).await?;

        if let Some(writer) = &self.writer {
            debug!(record_id = %record.id, attempts = ack.attempts, "Persisting record");
            writer
                .persist(&self.transformer.normalize(record))
                .await
                .map_err(|source| RecordError::Persistence {
                    source,
                    indexed: true,
                })?;
            *saved = true;
        }

        Ok(document)
    }
}

/// Running counts of a run.
#[derive(Debug, Default)]
struct Tally {
    pulled: usize,
    succeeded: usize,
    failed: usize,
    saved: usize,
}

impl Tally {
    /// Account for a finished worker and build its event.
    fn record(&mut self, joined: Result<Processed, JoinError>) -> SyncEvent {
        match joined {
            Ok(Processed {
                record_id,
                outcome,
                saved,
            }) => {
                if saved {
                    self.saved += 1;
                }
                match outcome {
                    Ok(document) => {
                        self.succeeded += 1;
                        SyncEvent::Data(document)
                    }
                    Err(cause) => {
                        self.failed += 1;
                        debug!(record_id = %record_id, error = %cause, "Record failed");
                        SyncEvent::Error(RecordFailure {
                            record_id: Some(record_id),
                            cause,
                        })
                    }
                }
            }
            Err(e) => {
                self.failed += 1;
                error!(error = %e, "Record worker failed");
                SyncEvent::Error(RecordFailure {
                    record_id: None,
                    cause: RecordError::Worker(e.to_string()),
                })
            }
        }
    }

    fn summary(&self, termination: Termination, elapsed: Duration) -> SyncSummary {
        SyncSummary {
            pulled: self.pulled,
            succeeded: self.succeeded,
            failed: self.failed,
            saved: self.saved,
            termination,
            elapsed,
        }
    }
}

/// State owned by the orchestrating task of one run.
struct SyncRun {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn SearchEngineClient>,
    worker: Arc<Worker>,
    filter: RecordFilter,
    config: SyncConfig,
    events_tx: mpsc::Sender<SyncEvent>,
    state_tx: watch::Sender<SyncState>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl SyncRun {
    #[instrument(skip_all, fields(
        concurrency = self.config.concurrency,
        save = self.config.save_on_synchronize
    ))]
    async fn run(self) {
        let SyncRun {
            store,
            client,
            worker,
            filter,
            config,
            events_tx,
            state_tx,
            mut shutdown_rx,
        } = self;

        info!(filter = %filter.as_json(), "Starting synchronization");
        let started = Instant::now();

        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let mut workers: JoinSet<Processed> = JoinSet::new();
        let mut tally = Tally::default();
        let mut termination = Termination::Exhausted;
        let mut consumer_gone = false;

        let mut cursor = RecordSource::open(store.as_ref(), &filter);
        state_tx.send_replace(SyncState::Pulling);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Received cancellation");
                    termination = Termination::Cancelled;
                    break;
                }

                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    let event = tally.record(joined);
                    if events_tx.send(event).await.is_err() {
                        info!("Event consumer went away");
                        consumer_gone = true;
                        termination = Termination::Cancelled;
                        break;
                    }
                }

                permit = permits.clone().acquire_owned() => {
                    // The semaphore is never closed.
                    let Ok(permit) = permit else { break };

                    let next = tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => None,
                        next = RecordSource::pull(&mut cursor, config.pull_timeout) => Some(next),
                    };

                    match next {
                        None => {
                            info!("Received cancellation");
                            termination = Termination::Cancelled;
                            break;
                        }
                        Some(None) => {
                            debug!(pulled = tally.pulled, "Record cursor exhausted");
                            break;
                        }
                        Some(Some(Err(e))) => {
                            error!(error = %e, pulled = tally.pulled, "Record cursor failed");
                            termination = Termination::SourceFailed(e.to_string());
                            break;
                        }
                        Some(Some(Ok(record))) => {
                            tally.pulled += 1;
                            let worker = worker.clone();
                            workers.spawn(async move {
                                let processed = worker.process(record).await;
                                drop(permit);
                                processed
                            });
                        }
                    }
                }
            }
        }

        // The cursor holds store resources; release it before draining.
        drop(cursor);
        state_tx.send_replace(SyncState::Draining);
        debug!(in_flight = workers.len(), "Draining workers");

        while let Some(joined) = workers.join_next().await {
            let event = tally.record(joined);
            if !consumer_gone && events_tx.send(event).await.is_err() {
                consumer_gone = true;
            }
        }

        if config.refresh_on_close && tally.succeeded > 0 && !consumer_gone {
            match tokio::time::timeout(config.submit_timeout, client.refresh()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Failed to refresh index"),
                Err(_) => warn!("Index refresh timed out"),
            }
        }

        let summary = tally.summary(termination, started.elapsed());
        info!(
            pulled = summary.pulled,
            succeeded = summary.succeeded,
            failed = summary.failed,
            saved = summary.saved,
            termination = ?summary.termination,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Synchronization complete"
        );

        state_tx.send_replace(SyncState::Closed);
        if !consumer_gone {
            let _ = events_tx.send(SyncEvent::Close(summary)).await;
        }
    }
}
