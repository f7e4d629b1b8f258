//! Events emitted by a synchronization run.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::errors::{PipelineError, RecordError};
use resync_shared::IndexableDocument;

/// One item of a synchronization stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The record was indexed (and saved, when saving is enabled).
    Data(IndexableDocument),
    /// The record could not be synchronized.
    Error(RecordFailure),
    /// The run is over. Always the last event, emitted exactly once.
    Close(SyncSummary),
}

/// A record that failed to synchronize.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// `None` only when the worker processing the record stopped unexpectedly.
    pub record_id: Option<Uuid>,
    pub cause: RecordError,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_id {
            Some(id) => write!(f, "record {}: {}", id, self.cause),
            None => write!(f, "unknown record: {}", self.cause),
        }
    }
}

/// Why a run stopped pulling records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The cursor was exhausted.
    Exhausted,
    /// Cancellation was requested or the consumer went away.
    Cancelled,
    /// The cursor failed.
    SourceFailed(String),
    /// The run ended without reporting a summary.
    Aborted,
}

/// Final tallies of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    /// Records pulled from the cursor.
    pub pulled: usize,
    /// Records that produced a data event.
    pub succeeded: usize,
    /// Records that produced an error event.
    pub failed: usize,
    /// Records written back to the store.
    pub saved: usize,
    pub termination: Termination,
    pub elapsed: Duration,
}

impl SyncSummary {
    /// Whether every pulled record produced exactly one outcome.
    pub fn is_balanced(&self) -> bool {
        self.succeeded + self.failed == self.pulled
    }

    /// Turn an incomplete run into an error.
    ///
    /// Exhausted and cancelled runs are complete; record failures never
    /// make a run fail.
    pub fn ensure_complete(&self) -> Result<(), PipelineError> {
        match &self.termination {
            Termination::Exhausted | Termination::Cancelled => Ok(()),
            Termination::SourceFailed(reason) => Err(PipelineError::SourceError(reason.clone())),
            Termination::Aborted => Err(PipelineError::Aborted),
        }
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Created, not yet pulling.
    Idle,
    /// Pulling records and dispatching workers.
    Pulling,
    /// No more pulls; waiting for in-flight workers.
    Draining,
    /// The run is over; no further record events follow, only the close event.
    Closed,
}
