//! Bounded task pools for Fanout
//!
//! A [`Pool`] is a [`TaskGroup`] with an optional limit on how many tasks run
//! at once. Spawning into a full pool blocks the caller until a running task
//! finishes. An [`ErrorPool`] runs fallible tasks and gathers their errors.
//!
//! ## Example
//!
//! ```rust
//! use fanout::ErrorPool;
//!
//! let pool = ErrorPool::new().with_max_tasks(2);
//! for i in 0..6 {
//!     pool.spawn(move || if i % 3 == 0 { Err(format!("task {} failed", i)) } else { Ok(()) });
//! }
//! let errors = pool.wait().unwrap_err();
//! assert_eq!(errors.len(), 2);
//! ```

use crate::error::MultiError;
use crate::group::TaskGroup;
use crate::panics::Panic;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

// =============================================================================
// Limiter
// =============================================================================

/// Counting limiter for in-flight tasks
#[derive(Debug, Default)]
struct Limiter {
    active: Mutex<usize>,
    freed: Condvar,
}

impl Limiter {
    fn acquire(self: &Arc<Self>, max: usize) -> Permit {
        let mut active = self.active.lock();
        while *active >= max {
            self.freed.wait(&mut active);
        }
        *active += 1;
        Permit(Arc::clone(self))
    }

    fn release(&self) {
        let mut active = self.active.lock();
        *active = active.saturating_sub(1);
        self.freed.notify_one();
    }
}

/// Slot in the limiter, released on drop even if the task panicked
struct Permit(Arc<Limiter>);

impl Drop for Permit {
    fn drop(&mut self) {
        self.0.release();
    }
}

// =============================================================================
// Pool
// =============================================================================

/// A task group that runs at most `max_tasks` tasks at once
#[derive(Debug, Default)]
pub struct Pool {
    group: TaskGroup,
    limiter: Arc<Limiter>,
    max_tasks: usize,
}

impl Pool {
    /// Create a pool with no limit on concurrent tasks
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of concurrently running tasks (0 = unlimited)
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Configured task limit (0 = unlimited)
    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    /// Run `work` on the pool, blocking while the pool is full
    pub fn spawn<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.max_tasks == 0 {
            self.group.spawn(work);
            return;
        }

        let permit = self.limiter.acquire(self.max_tasks);
        self.group.spawn(move || {
            let _permit = permit;
            work();
        });
    }

    /// Wait for every task, then re-raise the first panic if one occurred
    pub fn wait(&self) {
        self.group.join();
    }

    /// Wait for every task and return the first panic as a value
    pub fn wait_safe(&self) -> Result<(), Panic> {
        self.group.join_safe()
    }
}

// =============================================================================
// Error Pool
// =============================================================================

/// A pool of fallible tasks whose errors are combined on wait
#[derive(Debug)]
pub struct ErrorPool<E> {
    pool: Pool,
    errors: Arc<Mutex<Vec<E>>>,
    first_only: bool,
}

impl<E> Default for ErrorPool<E> {
    fn default() -> Self {
        Self {
            pool: Pool::default(),
            errors: Arc::new(Mutex::new(Vec::new())),
            first_only: false,
        }
    }
}

impl<E: Send + 'static> ErrorPool<E> {
    /// Create an error pool with no limit on concurrent tasks
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of concurrently running tasks (0 = unlimited)
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.pool = self.pool.with_max_tasks(max_tasks);
        self
    }

    /// Report only the first error returned instead of all of them
    pub fn with_first_error(mut self) -> Self {
        self.first_only = true;
        self
    }

    /// Run fallible `work` on the pool, blocking while the pool is full
    pub fn spawn<F>(&self, work: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        let errors = Arc::clone(&self.errors);
        self.pool.spawn(move || {
            if let Err(err) = work() {
                errors.lock().push(err);
            }
        });
    }

    /// Wait for every task and combine the errors they returned
    ///
    /// Errors are in completion order. A panic in any task is re-raised after
    /// every task has finished; the errors of that wave are dropped with it.
    pub fn wait(&self) -> Result<(), MultiError<E>> {
        let outcome = self.pool.wait_safe();
        let mut errors = std::mem::take(&mut *self.errors.lock());
        if let Err(caught) = outcome {
            caught.resume();
        }
        if self.first_only {
            errors.truncate(1);
        }
        MultiError::into_result(errors)
    }
}
