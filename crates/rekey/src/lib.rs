#![doc = include_str!("../README.md")]

mod barrier;
mod channel;
mod error;
mod id;
mod mutex;
mod pipeline;
mod pool;
mod record;
mod sink;
mod source;
mod stats;

pub use crate::barrier::*;
pub use crate::channel::*;
pub use crate::error::*;
pub use crate::id::*;
pub use crate::pipeline::*;
pub use crate::pool::*;
pub use crate::record::*;
pub use crate::sink::*;
pub use crate::source::*;
pub use crate::stats::*;
