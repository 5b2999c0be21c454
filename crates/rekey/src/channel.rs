//! The distribution channel between the orchestrator and the worker pool.
//!
//! An unbounded, multi-consumer hand-off queue. The producer side is a single
//! [`Feeder`]; pushing never blocks. Workers hold cloned [`WorkReceiver`]s and
//! compete for records, so consumption order is unspecified.
//!
//! The channel has two states. It is *open* while the [`Feeder`] is alive and
//! becomes *closed* exactly once, when [`Feeder::close`] consumes it. A closed
//! channel still yields its buffered records; once drained, every receiver
//! observes exhaustion.

use crate::{Error, Record, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};

/// Creates an open distribution channel.
pub fn distribution_channel() -> (Feeder, WorkReceiver) {
    let (tx, rx) = unbounded();
    (Feeder { tx, pushed: 0 }, WorkReceiver { rx })
}

/// The producing end of the distribution channel.
///
/// There is exactly one `Feeder` per channel; dropping it closes the channel.
#[derive(Debug)]
pub struct Feeder {
    tx: Sender<Record>,
    pushed: u64,
}

impl Feeder {
    /// Enqueues a record. Never blocks.
    ///
    /// # Errors
    /// - Returns [`Error::ChannelDisconnected`] if every [`WorkReceiver`] has
    ///   been dropped, i.e. no worker is left to process the record.
    pub fn push(&mut self, record: Record) -> Result<()> {
        self.tx
            .send(record)
            .map_err(|_| Error::ChannelDisconnected)?;
        self.pushed += 1;
        Ok(())
    }

    /// Number of records enqueued so far.
    pub const fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Closes the channel and returns the total number of records enqueued.
    pub fn close(self) -> u64 {
        self.pushed
    }
}

/// A consuming end of the distribution channel.
#[derive(Debug, Clone)]
pub struct WorkReceiver {
    rx: Receiver<Record>,
}

impl WorkReceiver {
    /// Blocks until a record is available.
    ///
    /// Returns `None` once the channel is closed and drained.
    pub fn recv(&self) -> Option<Record> {
        self.rx.recv().ok()
    }

    /// Number of records currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread::scope;

    fn record(id: usize) -> Record {
        Record {
            id: id.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn closed_channel_yields_buffered_records_then_exhausts() {
        let (mut feeder, receiver) = distribution_channel();
        for i in 0..3 {
            feeder.push(record(i)).unwrap();
        }
        assert_eq!(feeder.pushed(), 3);
        assert_eq!(feeder.close(), 3);

        assert_eq!(receiver.len(), 3);
        let drained: Vec<_> = std::iter::from_fn(|| receiver.recv()).collect();
        assert_eq!(drained.len(), 3);
        assert!(receiver.is_empty());
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn competing_receivers_take_each_record_exactly_once() {
        const RECORDS: usize = 10_000;
        const CONSUMERS: usize = 8;

        let (mut feeder, receiver) = distribution_channel();

        let seen = scope(|s| {
            let handles: Vec<_> = (0..CONSUMERS)
                .map(|_| {
                    let receiver = receiver.clone();
                    s.spawn(move || {
                        let mut ids = Vec::new();
                        while let Some(record) = receiver.recv() {
                            ids.push(record.id);
                        }
                        ids
                    })
                })
                .collect();

            for i in 0..RECORDS {
                feeder.push(record(i)).unwrap();
            }
            feeder.close();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(seen.len(), RECORDS);
        let unique: HashSet<_> = seen.into_iter().collect();
        assert_eq!(unique.len(), RECORDS);
    }

    #[test]
    fn push_fails_once_every_receiver_is_gone() {
        let (mut feeder, receiver) = distribution_channel();
        drop(receiver);

        assert!(matches!(
            feeder.push(record(0)),
            Err(Error::ChannelDisconnected)
        ));
        assert_eq!(feeder.pushed(), 0);
    }
}
