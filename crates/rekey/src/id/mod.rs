mod generator;
mod random;

pub use generator::*;
pub use random::*;
