//! Run counters and the end-of-run summary.

use core::fmt;
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};

/// Counters shared between the orchestrator and the workers during a run.
#[derive(Debug, Default)]
pub struct PipelineStats {
    written: AtomicU64,
    skipped: AtomicU64,
    write_failures: AtomicU64,
}

impl PipelineStats {
    /// Counts a row accepted by the output sink.
    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a malformed input row dropped by the orchestrator.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a row the output sink rejected.
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Rows accepted by the output sink so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Malformed rows skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Rows rejected by the output sink so far.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Freezes the counters into a [`RunSummary`].
    pub fn summary(&self, rows_fed: u64, elapsed: Duration) -> RunSummary {
        RunSummary {
            rows_fed,
            rows_skipped: self.skipped(),
            rows_written: self.written(),
            write_failures: self.write_failures(),
            elapsed,
        }
    }
}

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Well-formed rows handed to the worker pool.
    pub rows_fed: u64,
    /// Malformed rows dropped by the orchestrator.
    pub rows_skipped: u64,
    /// Rows accepted by the output sink.
    pub rows_written: u64,
    /// Rows the output sink rejected.
    pub write_failures: u64,
    /// Wall-clock time from the start of the run to the final flush.
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} rows in {:?} ({} written, {} skipped, {} write failures)",
            self.rows_fed, self.elapsed, self.rows_written, self.rows_skipped, self.write_failures
        )
    }
}
