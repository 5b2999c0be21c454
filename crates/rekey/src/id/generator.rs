//! Identifier generation for re-keyed records.
//!
//! Every record leaving the worker pool carries a version-4 UUID drawn from
//! 122 random bits, which keeps the collision probability for any realistic
//! run negligible.

use crate::{RandSource, ThreadRandom};
use uuid::{Builder, Uuid};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A minimal interface for producing fresh record identifiers.
///
/// Implementations are shared by every worker through an `Arc`, so
/// [`IdGenerator::next_id`] takes `&self` and must be callable concurrently.
pub trait IdGenerator: Send + Sync {
    /// Returns a newly generated identifier.
    fn next_id(&self) -> Uuid;
}

/// A random (version 4) UUID generator.
///
/// Draws 128 bits from its [`RandSource`] and stamps the version and RFC 4122
/// variant bits over them.
///
/// # Example
/// ```
/// use rekey::{IdGenerator, RandomUuidGenerator};
///
/// let generator = RandomUuidGenerator::default();
/// let id = generator.next_id();
/// assert_eq!(id.get_version_num(), 4);
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone)]
pub struct RandomUuidGenerator<R = ThreadRandom> {
    rng: R,
}

impl Default for RandomUuidGenerator<ThreadRandom> {
    fn default() -> Self {
        Self::new(ThreadRandom)
    }
}

impl<R> RandomUuidGenerator<R>
where
    R: RandSource<u128>,
{
    /// Creates a generator drawing from `rng`.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generates a version 4 UUID.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_uuid(&self) -> Uuid {
        Builder::from_random_bytes(self.rng.rand().to_be_bytes()).into_uuid()
    }
}

impl<R> IdGenerator for RandomUuidGenerator<R>
where
    R: RandSource<u128> + Send + Sync,
{
    fn next_id(&self) -> Uuid {
        self.next_uuid()
    }
}
