//! A fixed-size pool of OS threads that re-key records.
//!
//! Workers share one [`WorkReceiver`] (cloned per thread), one [`RowSink`],
//! and one [`IdGenerator`]. They never talk to each other: records arrive
//! through the distribution channel and leave through the sink's lock.
//!
//! Completion is signalled through the [`CompletionBarrier`] guards handed to
//! [`WorkerPool::spawn`], not by joining threads. [`WorkerPool::join`] is
//! called afterwards only to surface panics.
//!
//! [`CompletionBarrier`]: crate::CompletionBarrier

mod worker;

use crate::{BarrierRelease, Error, IdGenerator, PipelineStats, Result, RowSink, WorkReceiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use worker::worker_loop;

/// Handles to a running set of workers.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts one worker per barrier release.
    ///
    /// The pool size is `releases.len()`; each worker takes ownership of one
    /// guard and drops it when it exits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a thread cannot be started. Workers that
    /// were already running keep draining the channel and exit once it closes;
    /// the guards of workers that never started are dropped immediately.
    pub fn spawn<S, G>(
        receiver: &WorkReceiver,
        sink: &Arc<S>,
        generator: &Arc<G>,
        stats: &Arc<PipelineStats>,
        releases: Vec<BarrierRelease>,
    ) -> Result<Self>
    where
        S: RowSink + ?Sized + 'static,
        G: IdGenerator + ?Sized + 'static,
    {
        let mut workers = Vec::with_capacity(releases.len());

        for (worker_id, release) in releases.into_iter().enumerate() {
            let receiver = receiver.clone();
            let sink = Arc::clone(sink);
            let generator = Arc::clone(generator);
            let stats = Arc::clone(stats);

            let handle = thread::Builder::new()
                .name(format!("rekey-worker-{worker_id}"))
                .spawn(move || {
                    worker_loop(worker_id, receiver, &*sink, &*generator, &stats, release);
                })
                .map_err(|source| Error::Spawn { worker_id, source })?;

            workers.push(handle);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Spawned {} workers", workers.len());

        Ok(Self { workers })
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` if the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Joins every worker thread.
    ///
    /// Call after the completion barrier has been satisfied; by then every
    /// worker has left its loop and the joins return promptly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] for the first worker that panicked.
    /// All workers are joined regardless.
    pub fn join(self) -> Result<()> {
        let mut first_panic = None;

        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            if handle.join().is_err() {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {worker_id} panicked");
                if first_panic.is_none() {
                    first_panic = Some(worker_id);
                }
            }
        }

        match first_panic {
            Some(worker_id) => Err(Error::WorkerPanicked { worker_id }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CompletionBarrier, FIELD_COUNT, RandomUuidGenerator, Record, SinkError,
        distribution_channel,
    };
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        rows: Mutex<Vec<Vec<String>>>,
    }

    impl RowSink for CollectingSink {
        fn write_row(&self, row: &[&str]) -> Result<(), SinkError> {
            let row = row.iter().map(|f| (*f).to_owned()).collect();
            self.rows.lock().unwrap().push(row);
            Ok(())
        }

        fn flush(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    struct PanickingSink;

    impl RowSink for PanickingSink {
        fn write_row(&self, _: &[&str]) -> Result<(), SinkError> {
            panic!("sink exploded");
        }

        fn flush(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn record(i: usize) -> Record {
        Record {
            id: format!("old-{i}"),
            first_name: format!("first-{i}"),
            ..Record::default()
        }
    }

    #[test]
    fn workers_rekey_every_record_and_release_the_barrier() {
        const WORKERS: usize = 4;
        const RECORDS: usize = 1_000;

        let sink = Arc::new(CollectingSink::default());
        let generator = Arc::new(RandomUuidGenerator::default());
        let stats = Arc::new(PipelineStats::default());
        let (barrier, releases) = CompletionBarrier::new(WORKERS);
        let (mut feeder, receiver) = distribution_channel();

        let pool = WorkerPool::spawn(&receiver, &sink, &generator, &stats, releases).unwrap();
        assert_eq!(pool.len(), WORKERS);
        drop(receiver);

        for i in 0..RECORDS {
            feeder.push(record(i)).unwrap();
        }
        feeder.close();
        barrier.wait();
        pool.join().unwrap();

        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows.len(), RECORDS);
        assert_eq!(stats.written(), RECORDS as u64);

        let ids: HashSet<_> = rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids.len(), RECORDS);
        for row in rows.iter() {
            assert_eq!(row.len(), FIELD_COUNT);
            assert_eq!(row[0].len(), 36);
            assert!(!row[0].starts_with("old-"));
        }
    }

    #[test]
    fn idle_workers_still_release_the_barrier() {
        let sink = Arc::new(CollectingSink::default());
        let generator = Arc::new(RandomUuidGenerator::default());
        let stats = Arc::new(PipelineStats::default());
        let (barrier, releases) = CompletionBarrier::new(8);
        let (feeder, receiver) = distribution_channel();

        let pool = WorkerPool::spawn(&receiver, &sink, &generator, &stats, releases).unwrap();
        drop(receiver);

        assert_eq!(feeder.close(), 0);
        barrier.wait();
        pool.join().unwrap();
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn panicking_worker_is_reported_after_the_barrier() {
        let sink = Arc::new(PanickingSink);
        let generator = Arc::new(RandomUuidGenerator::default());
        let stats = Arc::new(PipelineStats::default());
        let (barrier, releases) = CompletionBarrier::new(1);
        let (mut feeder, receiver) = distribution_channel();

        let pool = WorkerPool::spawn(&receiver, &sink, &generator, &stats, releases).unwrap();
        drop(receiver);

        feeder.push(record(0)).unwrap();
        feeder.close();
        barrier.wait();

        assert!(matches!(
            pool.join(),
            Err(Error::WorkerPanicked { worker_id: 0 })
        ));
    }
}
