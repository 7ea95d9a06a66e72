//! Task groups for Fanout
//!
//! A [`TaskGroup`] spawns units of work on their own OS threads and joins them
//! as one wave. Every unit runs under a [`Catcher`], so a panic inside one unit
//! never stops its siblings and never hangs the joiner: the first panic is kept,
//! the unit is marked complete, and [`TaskGroup::join`] re-raises that panic once
//! every unit has finished.
//!
//! ## Example
//!
//! ```rust
//! use fanout::TaskGroup;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let count = Arc::new(AtomicUsize::new(0));
//! let group = TaskGroup::new();
//! for _ in 0..10 {
//!     let count = Arc::clone(&count);
//!     group.spawn(move || {
//!         count.fetch_add(1, Ordering::SeqCst);
//!     });
//! }
//! group.join();
//! assert_eq!(count.load(Ordering::SeqCst), 10);
//! ```

use crate::error::Error;
use crate::panics::{Catcher, Panic};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

// =============================================================================
// Shared State
// =============================================================================

/// Counter for naming task threads
static TASK_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_task_name() -> String {
    let id = TASK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("fanout-task-{}", id)
}

/// Bookkeeping for the wave currently being spawned or drained
#[derive(Debug, Default)]
struct Wave {
    /// Units spawned but not yet finished
    pending: usize,
    /// Set once a joiner has observed this wave drained
    joined: bool,
    /// First panic raised by any unit of this wave
    catcher: Arc<Catcher>,
}

#[derive(Debug, Default)]
struct GroupState {
    wave: Mutex<Wave>,
    /// Signalled when `pending` drops to zero
    drained: Condvar,
}

impl GroupState {
    /// Count a new unit, opening a fresh wave if the last one was joined.
    fn register(&self) -> Arc<Catcher> {
        let mut wave = self.wave.lock();
        if wave.pending == 0 && wave.joined {
            wave.catcher = Arc::default();
            wave.joined = false;
        }
        wave.pending += 1;
        Arc::clone(&wave.catcher)
    }

    fn complete(&self) {
        let mut wave = self.wave.lock();
        wave.pending = wave.pending.saturating_sub(1);
        if wave.pending == 0 {
            self.drained.notify_all();
        }
    }

    fn current(&self) -> Arc<Catcher> {
        Arc::clone(&self.wave.lock().catcher)
    }

    fn spawn_failed(&self, catcher: &Catcher, err: io::Error) {
        let err = Error::spawn(err);
        tracing::error!("{}", err);
        catcher.record(Panic::from_message(err.to_string()));
        self.complete();
    }

    /// Block until the caller's wave has drained and return its catcher.
    ///
    /// A joiner woken after a newer wave already opened still reports the
    /// wave it started waiting on.
    fn wait(&self) -> Arc<Catcher> {
        let mut wave = self.wave.lock();
        let catcher = Arc::clone(&wave.catcher);
        while wave.pending > 0 && Arc::ptr_eq(&wave.catcher, &catcher) {
            self.drained.wait(&mut wave);
        }
        if Arc::ptr_eq(&wave.catcher, &catcher) {
            wave.joined = true;
        }
        catcher
    }
}

// =============================================================================
// Task Group
// =============================================================================

/// A set of concurrently running units of work joined as one wave
///
/// `TaskGroup::default()` is ready to use. Clones share the same group, so a
/// clone can be moved into a task to spawn further work into the wave.
#[derive(Debug, Clone, Default)]
pub struct TaskGroup {
    state: Arc<GroupState>,
}

impl TaskGroup {
    /// Create an empty task group
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` on a new thread as part of this group
    ///
    /// Returns as soon as the thread is started. If the thread cannot be
    /// started, the failure is recorded like a panic and surfaces on join.
    pub fn spawn<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let catcher = self.state.register();
        let state = Arc::clone(&self.state);
        let unit = Arc::clone(&catcher);
        let spawned = thread::Builder::new()
            .name(next_task_name())
            .spawn(move || {
                unit.try_run(work);
                state.complete();
            });
        if let Err(err) = spawned {
            self.state.spawn_failed(&catcher, err);
        }
    }

    /// Run borrowing `work` on a new thread of `scope` as part of this group
    ///
    /// The group must be joined before `scope` ends for the panic to be
    /// observed; the scope itself never sees it.
    pub fn spawn_scoped<'scope, 'env, F>(
        &self,
        scope: &'scope thread::Scope<'scope, 'env>,
        work: F,
    ) where
        F: FnOnce() + Send + 'scope,
    {
        let catcher = self.state.register();
        let state = Arc::clone(&self.state);
        let unit = Arc::clone(&catcher);
        let spawned = thread::Builder::new()
            .name(next_task_name())
            .spawn_scoped(scope, move || {
                unit.try_run(work);
                state.complete();
            });
        if let Err(err) = spawned {
            self.state.spawn_failed(&catcher, err);
        }
    }

    /// Run `work` inline on the calling thread under this group's catcher
    ///
    /// Used by workers that already run inside the group and want each item
    /// to be guarded separately.
    pub(crate) fn guard<R>(&self, work: impl FnOnce() -> R) -> Option<R> {
        self.state.current().try_run(work)
    }

    /// Number of units still running
    pub fn len(&self) -> usize {
        self.state.wave.lock().pending
    }

    /// Whether every spawned unit has finished
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every unit, then re-raise the first panic if one occurred
    pub fn join(&self) {
        if let Err(caught) = self.join_safe() {
            caught.resume();
        }
    }

    /// Wait for every unit and return the first panic as a value
    ///
    /// Every caller joining the same wave sees its panic. The first of them
    /// receives the original payload; the others receive the panic message.
    /// The panic stays with the group until the next spawn after a join
    /// opens a new wave.
    pub fn join_safe(&self) -> Result<(), Panic> {
        tracing::debug!("Joining task group with {} outstanding tasks", self.len());
        match self.state.wait().share() {
            Some(caught) => Err(caught),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
