use rand::{Rng, rng};

/// A trait for random sources that return random integers.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests.
///
/// # Example
/// ```
/// use rekey::RandSource;
///
/// struct FixedRand;
/// impl RandSource<u128> for FixedRand {
///     fn rand(&self) -> u128 {
///         1234
///     }
/// }
///
/// let rng = FixedRand;
/// assert_eq!(rng.rand(), 1234);
/// ```
pub trait RandSource<T> {
    /// Returns a random integer.
    fn rand(&self) -> T;
}

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// This RNG is cryptographically secure (ChaCha-based) and reseeded
/// periodically. Each OS thread has its own instance, so workers draw
/// identifiers without contending on shared state.
///
/// The type is zero-sized and never stores the RNG, so it is `Send + Sync` even
/// though the underlying `ThreadRng` is not.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource<u128> for ThreadRandom {
    fn rand(&self) -> u128 {
        rng().random()
    }
}
