//! Bounded parallel iteration for Fanout
//!
//! Provides index iteration and typed map operations over slices using a
//! capped number of worker threads.

mod bounded;
mod map;

pub use bounded::{default_workers, BoundedIterator};
pub use map::{map, map_err, try_map, Mapper};
