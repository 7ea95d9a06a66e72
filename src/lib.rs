//! # Fanout - Structured Concurrency for Threads
//!
//! Fanout spawns work on OS threads and joins it back without losing panics,
//! and maps over slices with a capped number of workers.
//!
//! ## Features
//!
//! - **Task groups** - Spawn units of work and join them as one wave
//! - **Panic capture** - The first panic in a wave is kept and re-raised on join,
//!   or handed back as an error value with [`TaskGroup::join_safe`]
//! - **Bounded iteration** - Run a per-index action over at most N workers
//! - **Parallel map** - Ordered results, with every per-element error collected
//! - **Task pools** - Limit how many owned tasks run at once
//!
//! ## Quick Start
//!
//! Add Fanout to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! fanout = "0.1.0"
//! ```
//!
//! ### Task Groups
//!
//! ```rust
//! use fanout::TaskGroup;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let count = Arc::new(AtomicUsize::new(0));
//! let group = TaskGroup::new();
//! for _ in 0..3 {
//!     let count = Arc::clone(&count);
//!     group.spawn(move || {
//!         count.fetch_add(1, Ordering::SeqCst);
//!     });
//! }
//! group.spawn(|| panic!("super bad thing"));
//!
//! // Every task still ran; the panic comes back as a value.
//! let caught = group.join_safe().unwrap_err();
//! assert!(caught.to_string().contains("super bad thing"));
//! assert_eq!(count.load(Ordering::SeqCst), 3);
//! ```
//!
//! ### Parallel Map
//!
//! ```rust
//! use fanout::{map, map_err, Mapper};
//!
//! // Output order always matches input order.
//! let doubled = map(&[1, 2, 3], |x| x * 2);
//! assert_eq!(doubled, vec![2, 4, 6]);
//!
//! // Values are kept even for elements that also reported an error.
//! let (values, errors) = map_err(&[1, 2, 3], |x| {
//!     let err = (*x == 2).then(|| format!("rejected {}", x));
//!     (x * 2, err)
//! });
//! assert_eq!(values, vec![2, 4, 6]);
//! assert!(errors.unwrap_err().to_string().contains("rejected 2"));
//!
//! // Cap the number of workers explicitly.
//! let lengths = Mapper::new(2).map(&["a", "bb", "ccc"], |s| s.len());
//! assert_eq!(lengths, vec![1, 2, 3]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! map / map_err → BoundedIterator::for_each_indexed → TaskGroup::spawn_scoped
//!                                                   → TaskGroup::join → results
//! ```
//!
//! ### Main Components
//!
//! - [`Catcher`] / [`Panic`] - First-wins panic capture
//! - [`TaskGroup`] - Spawn, join, and panic propagation
//! - [`BoundedIterator`] - Index fan-out over a capped set of workers
//! - [`Mapper`] - Typed map operations on top of the iterator
//! - [`MultiError`] - Ordered aggregate of per-element errors
//! - [`Pool`] / [`ErrorPool`] - Bounded spawners for owned tasks
//!
//! ## Error Handling
//!
//! Panics inside spawned work are always captured, never dropped. The raising
//! APIs (`join`, `for_each_*`, `map*`, `Pool::wait`) re-raise the first one
//! after every unit has finished. The safe APIs return it as a [`Panic`], which
//! converts into [`Error`] with `?`:
//!
//! ```rust
//! use fanout::{Error, TaskGroup};
//!
//! fn run_wave() -> fanout::Result<()> {
//!     let group = TaskGroup::new();
//!     group.spawn(|| panic!("invalid state"));
//!     group.join_safe()?;
//!     Ok(())
//! }
//!
//! match run_wave() {
//!     Err(Error::Panicked(caught)) => assert_eq!(caught.message(), "invalid state"),
//!     other => panic!("expected a captured panic, got {:?}", other),
//! }
//! ```
//!
//! ## Logging
//!
//! Fanout emits `tracing` events (captured panics at `warn`, fan-out and join
//! at `debug`) and leaves subscriber setup to the application.
//!
//! ## License
//!
//! Licensed under the [MIT License](https://opensource.org/licenses/MIT).

/// Version of the Fanout crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod group;
pub mod iter;
pub mod panics;
pub mod pool;

// Re-export main types
pub use error::{Error, MultiError, Result};
pub use group::TaskGroup;
pub use iter::{default_workers, map, map_err, try_map, BoundedIterator, Mapper};
pub use panics::{Catcher, Panic};
pub use pool::{ErrorPool, Pool};
