use crate::{BarrierRelease, IdGenerator, PipelineStats, RowSink, WorkReceiver};

/// Worker loop responsible for re-keying [`Record`]s.
///
/// Each worker repeatedly pulls a record from the shared [`WorkReceiver`],
/// overwrites its identifier with one drawn from `generator`, and appends the
/// result to `sink`. The loop ends once the channel is closed and drained.
///
/// # Arguments
///
/// - `_worker_id`: Index of this worker (used for logs/tracing).
/// - `receiver`: This worker's handle on the distribution channel.
/// - `sink`: Shared output sink; all mutual exclusion happens inside it.
/// - `generator`: Shared identifier generator.
/// - `stats`: Run counters.
/// - `release`: This worker's share of the completion barrier. It is owned by
///   the loop and dropped on every exit path, including unwinding, so the
///   orchestrator is released even if the worker never saw a record.
///
/// A failed write is logged and counted; the record is lost and the worker
/// moves on to the next one.
///
/// [`Record`]: crate::Record
pub(crate) fn worker_loop<S, G>(
    _worker_id: usize,
    receiver: WorkReceiver,
    sink: &S,
    generator: &G,
    stats: &PipelineStats,
    release: BarrierRelease,
) where
    S: RowSink + ?Sized,
    G: IdGenerator + ?Sized,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} started");
    #[cfg(feature = "tracing")]
    let mut processed = 0_u64;

    while let Some(mut record) = receiver.recv() {
        record.assign_id(&generator.next_id());

        match sink.write_row(&record.as_row()) {
            Ok(()) => stats.record_written(),
            Err(_e) => {
                stats.record_write_failure();
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {_worker_id} failed to write row {}: {_e}", record.id);
            }
        }
        #[cfg(feature = "tracing")]
        {
            processed += 1;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} stopped after {processed} rows");

    drop(release);
}
