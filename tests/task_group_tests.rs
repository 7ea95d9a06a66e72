//! Integration tests for task groups
//!
//! These tests verify that every spawned unit runs to completion and that
//! panics are surfaced exactly once, either re-raised or returned as a value.

use fanout::{Error, TaskGroup};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Helper to spawn a unit that bumps `counter`
fn spawn_increment(group: &TaskGroup, counter: &Arc<AtomicI64>) {
    let counter = Arc::clone(counter);
    group.spawn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
}

// =============================================================================
// Normal Completion
// =============================================================================

#[test]
fn test_ten_units_all_run() {
    let count = Arc::new(AtomicI64::new(0));
    let group = TaskGroup::default();
    for _ in 0..10 {
        spawn_increment(&group, &count);
    }
    group.join();
    assert_eq!(count.load(Ordering::SeqCst), 10);
}

#[test]
fn test_hundred_units_all_run() {
    let count = Arc::new(AtomicI64::new(0));
    let group = TaskGroup::new();
    for _ in 0..100 {
        spawn_increment(&group, &count);
    }
    group.join();
    assert_eq!(count.load(Ordering::SeqCst), 100);
}

#[test]
fn test_spawn_from_many_threads() {
    let count = Arc::new(AtomicI64::new(0));
    let group = TaskGroup::new();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..25 {
                    spawn_increment(&group, &count);
                }
            });
        }
    });
    group.join();
    assert_eq!(count.load(Ordering::SeqCst), 100);
}

// =============================================================================
// Panic Propagation
// =============================================================================

#[test]
#[should_panic(expected = "super bad thing")]
fn test_panic_is_propagated() {
    let group = TaskGroup::new();
    group.spawn(|| panic!("super bad thing"));
    group.join();
}

#[test]
#[should_panic(expected = "bad")]
fn test_one_of_two_panics_is_propagated() {
    let group = TaskGroup::new();
    group.spawn(|| panic!("super bad thing"));
    group.spawn(|| panic!("super badder thing"));
    group.join();
}

#[test]
#[should_panic(expected = "super bad thing")]
fn test_nonpanics_do_not_overwrite_panic() {
    let group = TaskGroup::new();
    group.spawn(|| panic!("super bad thing"));
    for _ in 0..10 {
        group.spawn(|| {});
    }
    group.join();
}

#[test]
fn test_nonpanics_run_successfully() {
    let count = Arc::new(AtomicI64::new(0));
    let group = TaskGroup::new();
    spawn_increment(&group, &count);
    group.spawn(|| panic!("super bad thing"));
    spawn_increment(&group, &count);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| group.join()));
    assert!(result.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Safe Join
// =============================================================================

#[test]
fn test_panic_is_caught_by_join_safe() {
    let group = TaskGroup::new();
    group.spawn(|| panic!("super bad thing"));
    let caught = group.join_safe().unwrap_err();
    assert!(caught.to_string().contains("super bad thing"), "{}", caught);
}

#[test]
fn test_one_panic_is_caught_by_join_safe() {
    let group = TaskGroup::new();
    group.spawn(|| panic!("one bad thing"));
    group.spawn(|| panic!("another bad thing"));
    let caught = group.join_safe().unwrap_err();
    assert!(caught.to_string().contains("bad thing"), "{}", caught);
}

#[test]
fn test_nonpanics_run_successfully_with_join_safe() {
    let count = Arc::new(AtomicI64::new(0));
    let group = TaskGroup::new();
    spawn_increment(&group, &count);
    group.spawn(|| panic!("super bad thing"));
    spawn_increment(&group, &count);

    let caught = group.join_safe().unwrap_err();
    assert!(caught.to_string().contains("super bad thing"), "{}", caught);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_join_safe_converts_into_crate_error() {
    fn wave() -> fanout::Result<()> {
        let group = TaskGroup::new();
        group.spawn(|| panic!("invalid state reached"));
        group.join_safe()?;
        Ok(())
    }

    let err = wave().unwrap_err();
    assert!(matches!(err, Error::Panicked(_)));
    assert_eq!(err.as_panic().unwrap().message(), "invalid state reached");
}

#[test]
fn test_join_safe_converts_into_anyhow() {
    fn wave() -> anyhow::Result<()> {
        let group = TaskGroup::new();
        group.spawn(|| panic!("fault inside worker"));
        group.join_safe()?;
        Ok(())
    }

    let err = wave().unwrap_err();
    assert!(err.to_string().contains("fault inside worker"));
}
