//! Consumer side of a synchronization run.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use super::events::{RecordFailure, SyncEvent, SyncState, SyncSummary, Termination};
use resync_shared::IndexableDocument;

type DataListener<'a> = Box<dyn FnMut(&IndexableDocument) + Send + 'a>;
type ErrorListener<'a> = Box<dyn FnMut(&RecordFailure) + Send + 'a>;
type CloseListener<'a> = Box<dyn FnOnce(&SyncSummary) + Send + 'a>;

/// Callbacks invoked by [`SyncStream::drive`].
///
/// Unset listeners ignore their events.
pub struct SyncListeners<'a> {
    on_data: Option<DataListener<'a>>,
    on_error: Option<ErrorListener<'a>>,
    on_close: Option<CloseListener<'a>>,
}

impl<'a> SyncListeners<'a> {
    pub fn new() -> Self {
        Self {
            on_data: None,
            on_error: None,
            on_close: None,
        }
    }

    /// Called once per successfully synchronized record.
    pub fn on_data(mut self, listener: impl FnMut(&IndexableDocument) + Send + 'a) -> Self {
        self.on_data = Some(Box::new(listener));
        self
    }

    /// Called once per failed record.
    pub fn on_error(mut self, listener: impl FnMut(&RecordFailure) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(listener));
        self
    }

    /// Called once, after every data and error event.
    pub fn on_close(mut self, listener: impl FnOnce(&SyncSummary) + Send + 'a) -> Self {
        self.on_close = Some(Box::new(listener));
        self
    }
}

impl Default for SyncListeners<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle that cancels a run from elsewhere.
///
/// Cancelling stops further pulls; in-flight records still produce their
/// events before the close event.
#[derive(Debug, Clone)]
pub struct SyncCanceller {
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncCanceller {
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// The outcome stream of one synchronization run.
///
/// Yields one [`SyncEvent::Data`] or [`SyncEvent::Error`] per pulled record,
/// then a single [`SyncEvent::Close`], then ends. Dropping the stream
/// cancels the run.
pub struct SyncStream {
    events: ReceiverStream<SyncEvent>,
    state: watch::Receiver<SyncState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncStream {
    pub(crate) fn new(
        events: ReceiverStream<SyncEvent>,
        state: watch::Receiver<SyncState>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            events,
            state,
            shutdown_tx,
        }
    }

    /// Current lifecycle state of the run.
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn canceller(&self) -> SyncCanceller {
        SyncCanceller {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Consume the stream, dispatching every event to `listeners`.
    ///
    /// Returns the run summary. If the run ends without a close event, an
    /// [`Termination::Aborted`] summary built from the observed events is
    /// passed to `on_close` instead.
    pub async fn drive(mut self, mut listeners: SyncListeners<'_>) -> SyncSummary {
        let mut succeeded = 0;
        let mut failed = 0;

        while let Some(event) = self.next().await {
            match event {
                SyncEvent::Data(document) => {
                    succeeded += 1;
                    if let Some(on_data) = listeners.on_data.as_mut() {
                        on_data(&document);
                    }
                }
                SyncEvent::Error(failure) => {
                    failed += 1;
                    if let Some(on_error) = listeners.on_error.as_mut() {
                        on_error(&failure);
                    }
                }
                SyncEvent::Close(summary) => {
                    if let Some(on_close) = listeners.on_close.take() {
                        on_close(&summary);
                    }
                    return summary;
                }
            }
        }

        warn!(
            succeeded = succeeded,
            failed = failed,
            "Synchronization ended without a close event"
        );
        let summary = SyncSummary {
            pulled: succeeded + failed,
            succeeded,
            failed,
            saved: 0,
            termination: Termination::Aborted,
            elapsed: Duration::ZERO,
        };
        if let Some(on_close) = listeners.on_close.take() {
            on_close(&summary);
        }
        summary
    }
}

impl Stream for SyncStream {
    type Item = SyncEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}
