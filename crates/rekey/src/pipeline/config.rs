use crate::{Error, Result};

/// Number of workers used when no other value is configured.
///
/// Large enough to overlap identifier generation with output I/O, small enough
/// to keep contention on the output lock bounded. Not derived from input size.
pub const DEFAULT_NUM_WORKERS: usize = 10;

/// Static configuration of a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker threads, fixed for the lifetime of a run.
    pub num_workers: usize,
}

impl PipelineConfig {
    /// Creates a configuration with `num_workers` workers.
    ///
    /// # Errors
    /// - Returns [`Error::InvalidConfig`] if `num_workers` is zero.
    pub fn with_workers(num_workers: usize) -> Result<Self> {
        let config = Self { num_workers };
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_workers must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
        }
    }
}
