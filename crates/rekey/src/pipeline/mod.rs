//! The orchestrator.
//!
//! A [`Pipeline`] owns one run from header discard to final flush:
//!
//! ```text
//! Init -> Priming -> Feeding -> Draining -> Flushed -> Done
//! ```
//!
//! - **Init**: streams are open (the caller's job; failing to open them is the
//!   only fatal start-up condition and never reaches the pipeline).
//! - **Priming**: the header row is discarded and the worker pool is started.
//! - **Feeding**: rows are read one at a time and pushed onto the distribution
//!   channel. Malformed rows are logged and skipped.
//! - **Draining**: the channel is closed and the orchestrator blocks on the
//!   completion barrier until every worker has exited.
//! - **Flushed**: the output sink is flushed exactly once.
//! - **Done**: the run summary is reported.

mod config;

pub use config::*;

use crate::{
    CompletionBarrier, Error, IdGenerator, PipelineStats, RecordSource, Result, RowSink,
    RunSummary, WorkerPool, distribution_channel,
};
use std::sync::Arc;
use std::time::Instant;

/// Stages of a pipeline run, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PipelineState {
    Init,
    Priming,
    Feeding,
    Draining,
    Flushed,
    Done,
}

/// Re-keys every record of a [`RecordSource`] into a [`RowSink`] using a fixed
/// pool of workers.
///
/// # Example
/// ```
/// use rekey::{CsvSink, CsvSource, Pipeline, PipelineConfig, RandomUuidGenerator};
/// use std::sync::Arc;
///
/// let input = "id,firstName,lastName,email,address,city,country\n\
///              id1,A,B,a@b.com,Addr,City,Country\n\
///              bad,row\n";
///
/// let pipeline = Pipeline::new(PipelineConfig::default(), RandomUuidGenerator::default()).unwrap();
/// let sink = Arc::new(CsvSink::new(Vec::new()));
/// let summary = pipeline.run(CsvSource::new(input.as_bytes()), Arc::clone(&sink)).unwrap();
///
/// assert_eq!(summary.rows_fed, 1);
/// assert_eq!(summary.rows_skipped, 1);
///
/// let output = Arc::into_inner(sink).unwrap().into_inner().unwrap();
/// let output = String::from_utf8(output).unwrap();
/// assert!(output.ends_with(",A,B,a@b.com,Addr,City,Country\n"));
/// assert_eq!(output.find(',').unwrap(), 36);
/// ```
#[derive(Debug)]
pub struct Pipeline<G: ?Sized> {
    config: PipelineConfig,
    generator: Arc<G>,
}

impl<G> Pipeline<G>
where
    G: IdGenerator + 'static,
{
    /// Creates a pipeline that draws identifiers from `generator`.
    ///
    /// # Errors
    /// - Returns [`Error::InvalidConfig`] if `config` is invalid.
    pub fn new(config: PipelineConfig, generator: G) -> Result<Self> {
        Self::with_shared_generator(config, Arc::new(generator))
    }
}

impl<G> Pipeline<G>
where
    G: IdGenerator + ?Sized + 'static,
{
    /// Creates a pipeline around an already shared generator.
    ///
    /// # Errors
    /// - Returns [`Error::InvalidConfig`] if `config` is invalid.
    pub fn with_shared_generator(config: PipelineConfig, generator: Arc<G>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, generator })
    }

    /// The configuration this pipeline runs with.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline to completion.
    ///
    /// Returns once every record pushed onto the distribution channel has been
    /// handed to `sink`, every worker has exited, and `sink` has been flushed.
    ///
    /// # Errors
    ///
    /// Malformed rows and failed writes do not fail the run; they are logged
    /// and counted in the returned [`RunSummary`]. The run fails if:
    /// - a worker thread cannot be spawned ([`Error::Spawn`]),
    /// - every worker died before the input was exhausted
    ///   ([`Error::ChannelDisconnected`]),
    /// - a worker panicked ([`Error::WorkerPanicked`]),
    /// - the final flush failed ([`Error::Flush`]).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(workers = self.config.num_workers))
    )]
    pub fn run<I, S>(&self, mut source: I, sink: Arc<S>) -> Result<RunSummary>
    where
        I: RecordSource,
        S: RowSink + ?Sized + 'static,
    {
        let start = Instant::now();
        let mut state = PipelineState::Init;

        advance(&mut state, PipelineState::Priming);
        match source.skip_header() {
            Ok(true) => {}
            Ok(false) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Input is empty: no header row");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to read header row: {_e}");
            }
        }

        let stats = Arc::new(PipelineStats::default());
        let (barrier, releases) = CompletionBarrier::new(self.config.num_workers);
        let (mut feeder, receiver) = distribution_channel();
        let pool = WorkerPool::spawn(&receiver, &sink, &self.generator, &stats, releases)?;
        // Only workers hold receivers from here on; if they all die, pushing
        // fails.
        drop(receiver);

        advance(&mut state, PipelineState::Feeding);
        for row in source {
            match row {
                Ok(record) => feeder.push(record)?,
                Err(_e) => {
                    stats.record_skipped();
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Skipping malformed row: {_e}");
                }
            }
        }

        advance(&mut state, PipelineState::Draining);
        let rows_fed = feeder.close();
        barrier.wait();
        pool.join()?;
        debug_assert_eq!(stats.written() + stats.write_failures(), rows_fed);

        sink.flush().map_err(Error::Flush)?;
        advance(&mut state, PipelineState::Flushed);

        let summary = stats.summary(rows_fed, start.elapsed());
        advance(&mut state, PipelineState::Done);
        debug_assert_eq!(state, PipelineState::Done);

        #[cfg(feature = "tracing")]
        {
            tracing::info!("Processed {} rows in {:?}", summary.rows_fed, summary.elapsed);
            if summary.rows_skipped > 0 {
                tracing::warn!("Skipped {} malformed rows", summary.rows_skipped);
            }
            if summary.write_failures > 0 {
                tracing::warn!("{} rows could not be written", summary.write_failures);
            }
        }

        Ok(summary)
    }
}

/// Moves `state` to `next`. Stages are never re-entered or skipped backwards.
fn advance(state: &mut PipelineState, next: PipelineState) {
    debug_assert!(next > *state, "pipeline cannot go from {state:?} to {next:?}");
    #[cfg(feature = "tracing")]
    tracing::debug!("Pipeline {:?} -> {:?}", state, next);
    *state = next;
}
