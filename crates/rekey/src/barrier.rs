//! A countdown barrier the orchestrator waits on until every worker has
//! exited.

use crossbeam_utils::sync::WaitGroup;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A rendezvous point for a fixed number of workers.
///
/// Created together with exactly `count` [`BarrierRelease`] guards, one per
/// worker. Dropping a guard counts that worker out, on every exit path
/// including unwinding. [`CompletionBarrier::wait`] returns once all guards are
/// gone.
///
/// # Example
/// ```
/// use rekey::CompletionBarrier;
///
/// let (barrier, releases) = CompletionBarrier::new(4);
/// let handles: Vec<_> = releases
///     .into_iter()
///     .map(|release| std::thread::spawn(move || drop(release)))
///     .collect();
///
/// barrier.wait();
/// # for h in handles { h.join().unwrap(); }
/// ```
#[derive(Debug)]
pub struct CompletionBarrier {
    wait_group: WaitGroup,
    remaining: Arc<AtomicUsize>,
}

/// A single worker's share of a [`CompletionBarrier`].
///
/// Not `Clone`; each guard releases exactly one unit when dropped.
#[derive(Debug)]
pub struct BarrierRelease {
    _wait_group: WaitGroup,
    remaining: Arc<AtomicUsize>,
}

impl CompletionBarrier {
    /// Creates a barrier initialized to `count`, along with its `count`
    /// release guards.
    pub fn new(count: usize) -> (Self, Vec<BarrierRelease>) {
        let wait_group = WaitGroup::new();
        let remaining = Arc::new(AtomicUsize::new(count));

        let releases = (0..count)
            .map(|_| BarrierRelease {
                _wait_group: wait_group.clone(),
                remaining: Arc::clone(&remaining),
            })
            .collect();

        (
            Self {
                wait_group,
                remaining,
            },
            releases,
        )
    }

    /// Number of guards not yet released.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Blocks until every [`BarrierRelease`] has been dropped.
    pub fn wait(self) {
        self.wait_group.wait();
        debug_assert_eq!(self.remaining.load(Ordering::Acquire), 0);
    }
}

impl Drop for BarrierRelease {
    fn drop(&mut self) {
        // Runs before the wait group field is dropped, so the counter is
        // already zero when `wait` returns.
        self.remaining.fetch_sub(1, Ordering::AcqRel);
    }
}
