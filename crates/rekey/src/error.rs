//! Error types for the re-keying pipeline.
//!
//! Errors fall into three families:
//! - [`SourceError`]: a single input row could not be turned into a
//!   [`Record`]. The row is skipped and the pipeline keeps going.
//! - [`SinkError`]: the output sink rejected a write or a flush.
//! - [`Error`]: a condition that stops a pipeline run.
//!
//! [`Record`]: crate::Record

use thiserror::Error;

/// A result type defaulting to the pipeline-level [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Conditions that end a pipeline run early.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The pipeline was configured with values it cannot run with.
    #[error("Invalid pipeline configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The OS refused to start a worker thread.
    #[error("Failed to spawn worker {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },

    /// A record was pushed after every worker had already exited.
    #[error("Distribution channel disconnected: no worker is left to receive records")]
    ChannelDisconnected,

    /// A worker thread panicked while processing records.
    #[error("Worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },

    /// The final flush of the output sink failed, so the output cannot be
    /// reported complete.
    #[error("Failed to flush output: {0}")]
    Flush(#[source] SinkError),
}

/// A malformed input row.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SourceError {
    /// The row did not carry exactly [`FIELD_COUNT`](crate::FIELD_COUNT)
    /// fields.
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The CSV reader could not decode the row (invalid UTF-8, I/O failure).
    #[error("unreadable row: {0}")]
    Csv(#[from] csv::Error),
}

/// A failure reported by the output sink.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SinkError {
    /// The CSV writer failed to encode or write a row.
    #[error("write failed: {0}")]
    Csv(#[from] csv::Error),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another writer panicked while holding the output lock.
    ///
    /// Only reachable with `std::sync::Mutex`; `parking_lot` mutexes do not
    /// poison.
    #[error("Output lock poisoned")]
    LockPoisoned,

    /// An earlier write failed after part of its row had reached the output.
    ///
    /// Any later row would be appended to that fragment, so the sink rejects
    /// every write from then on.
    #[error("Output holds a partially written row; no further rows are accepted")]
    Torn,
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for SinkError {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
