//! Bounded iterator for Fanout operations
//!
//! Fans an index range out over at most `max_workers` threads. Workers pull
//! the next index from a shared counter, so every index runs exactly once no
//! matter how uneven the per-index cost is.

use crate::group::TaskGroup;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Number of workers used when none is configured
///
/// Follows the host's available parallelism and is never zero.
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Configuration for bounded parallel iteration
///
/// The default value is ready to use and reusable across calls and threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundedIterator {
    /// Maximum number of concurrently active workers (0 = host parallelism)
    pub max_workers: usize,
}

impl BoundedIterator {
    /// Create an iterator capped at `max_workers` (0 = host parallelism)
    pub fn new(max_workers: usize) -> Self {
        Self { max_workers }
    }

    /// Replace the worker cap
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Effective worker cap, with the default applied
    pub fn max_workers(&self) -> usize {
        if self.max_workers == 0 {
            default_workers()
        } else {
            self.max_workers
        }
    }

    /// Number of workers started for an input of `len` items
    pub fn workers_for(&self, len: usize) -> usize {
        self.max_workers().min(len)
    }

    /// Call `action(i)` for every `i` in `0..len`, in parallel
    ///
    /// Blocks until every index has been processed. A panic in one call does
    /// not skip any other index; the first panic is re-raised after all calls
    /// have finished.
    ///
    /// # Example
    /// ```rust
    /// use fanout::BoundedIterator;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let sum = AtomicUsize::new(0);
    /// BoundedIterator::new(4).for_each_indexed(100, |i| {
    ///     sum.fetch_add(i, Ordering::Relaxed);
    /// });
    /// assert_eq!(sum.into_inner(), 4950);
    /// ```
    pub fn for_each_indexed<F>(&self, len: usize, action: F)
    where
        F: Fn(usize) + Sync,
    {
        if len == 0 {
            return;
        }

        let workers = self.workers_for(len);
        tracing::debug!("Fanning out {} items across {} workers", len, workers);

        let next = AtomicUsize::new(0);
        let group = TaskGroup::new();
        let outcome = thread::scope(|scope| {
            let worker = || loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= len {
                    break;
                }
                // Per-index guard: a panic must not skip the rest of this worker's share.
                group.guard(|| action(index));
            };
            for _ in 0..workers {
                group.spawn_scoped(scope, worker);
            }
            group.join_safe()
        });

        if let Err(caught) = outcome {
            caught.resume();
        }
    }

    /// Call `action` on every element of `items`, in parallel
    pub fn for_each<T, F>(&self, items: &[T], action: F)
    where
        T: Sync,
        F: Fn(&T) + Sync,
    {
        self.for_each_indexed(items.len(), |i| action(&items[i]));
    }

    /// Call `action` on every element of `items` with exclusive access, in parallel
    pub fn for_each_mut<T, F>(&self, items: &mut [T], action: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        // Each cell is locked by exactly one worker, so the locks never contend.
        let cells: Vec<Mutex<&mut T>> = items.iter_mut().map(Mutex::new).collect();
        self.for_each_indexed(cells.len(), |i| {
            let mut cell = cells[i].lock();
            action(&mut **cell);
        });
    }
}
