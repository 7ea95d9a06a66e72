//! Panic capture for spawned work
//!
//! A [`Catcher`] runs closures under `catch_unwind` and keeps the first panic
//! it sees. Later panics are logged and dropped. [`Panic`] is the captured
//! value: it keeps the original payload so it can be re-raised unchanged, and
//! the payload text so it can be handled as an ordinary error.
//!
//! ## Example
//!
//! ```rust
//! use fanout::Catcher;
//!
//! let catcher = Catcher::default();
//! assert_eq!(catcher.try_run(|| 21 * 2), Some(42));
//! assert_eq!(catcher.try_run(|| -> i32 { panic!("invalid state") }), None);
//!
//! let captured = catcher.take().unwrap();
//! assert!(captured.to_string().contains("invalid state"));
//! ```

use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use thiserror::Error;

type Payload = Box<dyn Any + Send + 'static>;

/// A panic captured from a unit of work
///
/// The `Display` form always contains the panic message for `&str` and
/// `String` payloads, which covers `panic!` with or without format arguments.
#[derive(Error, Debug)]
#[error("panic in {thread}: {message}")]
pub struct Panic {
    message: String,
    thread: String,
    // Behind a mutex so `Panic` stays Sync.
    payload: Mutex<Payload>,
}

impl Panic {
    /// Wrap a payload returned by `catch_unwind`
    pub fn from_payload(payload: Payload) -> Self {
        Self {
            message: payload_message(&*payload),
            thread: current_thread_name(),
            payload: Mutex::new(payload),
        }
    }

    /// Build a panic from a plain message, with the message as payload
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            payload: Mutex::new(Box::new(message.clone())),
            message,
            thread: current_thread_name(),
        }
    }

    /// Text extracted from the payload
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the thread the panic was captured on
    pub fn thread_name(&self) -> &str {
        &self.thread
    }

    /// Copy this panic, handing the original payload to the copy
    ///
    /// `self` keeps the message and is left with a `String` payload of it, so
    /// a panic can be reported more than once.
    pub fn detach(&self) -> Self {
        let fallback: Payload = Box::new(self.message.clone());
        let payload = std::mem::replace(&mut *self.payload.lock(), fallback);
        Self {
            message: self.message.clone(),
            thread: self.thread.clone(),
            payload: Mutex::new(payload),
        }
    }

    /// Give back the original payload
    pub fn into_payload(self) -> Payload {
        self.payload.into_inner()
    }

    /// Re-raise the panic on the current thread with its original payload
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.into_payload())
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

fn current_thread_name() -> String {
    thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string()
}

/// Runs closures and keeps the first panic any of them raised
///
/// Safe to share between threads: the slot is set at most once until taken.
#[derive(Debug, Default)]
pub struct Catcher {
    recovered: Mutex<Option<Panic>>,
}

impl Catcher {
    /// Create an empty catcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, returning its value, or `None` if it panicked
    pub fn try_run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                self.record(Panic::from_payload(payload));
                None
            }
        }
    }

    /// Store `caught` unless an earlier panic is already held
    ///
    /// Returns whether `caught` was kept.
    pub fn record(&self, caught: Panic) -> bool {
        let mut slot = self.recovered.lock();
        if slot.is_some() {
            tracing::warn!(
                "Discarding panic in {} ({}): an earlier panic was already captured",
                caught.thread_name(),
                caught.message()
            );
            return false;
        }
        tracing::warn!(
            "Captured panic in {}: {}",
            caught.thread_name(),
            caught.message()
        );
        *slot = Some(caught);
        true
    }

    /// Message of the captured panic, if any
    pub fn recovered(&self) -> Option<String> {
        self.recovered
            .lock()
            .as_ref()
            .map(|caught| caught.message().to_string())
    }

    /// Whether a panic has been captured and not yet taken
    pub fn has_panicked(&self) -> bool {
        self.recovered.lock().is_some()
    }

    /// Copy of the captured panic, leaving it captured
    ///
    /// Only the first copy carries the original payload; see [`Panic::detach`].
    pub fn share(&self) -> Option<Panic> {
        self.recovered.lock().as_ref().map(Panic::detach)
    }

    /// Take the captured panic, leaving the catcher empty
    pub fn take(&self) -> Option<Panic> {
        self.recovered.lock().take()
    }

    /// Re-raise the captured panic, if any
    pub fn repanic(&self) {
        if let Some(caught) = self.take() {
            caught.resume();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_run_returns_value() {
        let catcher = Catcher::new();
        assert_eq!(catcher.try_run(|| "ok"), Some("ok"));
        assert!(!catcher.has_panicked());
        assert!(catcher.recovered().is_none());
    }

    #[test]
    fn test_static_str_payload() {
        let catcher = Catcher::new();
        catcher.try_run(|| panic!("super bad thing"));
        assert_eq!(catcher.recovered().as_deref(), Some("super bad thing"));
    }

    #[test]
    fn test_formatted_payload() {
        let catcher = Catcher::new();
        let index = 3;
        catcher.try_run(|| panic!("item {} is invalid", index));
        assert_eq!(catcher.recovered().as_deref(), Some("item 3 is invalid"));
    }

    #[test]
    fn test_opaque_payload() {
        let catcher = Catcher::new();
        catcher.try_run(|| panic::panic_any(42_u32));
        let caught = catcher.take().unwrap();
        assert_eq!(caught.message(), "Box<dyn Any>");
        let payload = caught.into_payload();
        assert_eq!(payload.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_first_panic_wins() {
        let catcher = Catcher::new();
        catcher.try_run(|| panic!("first"));
        catcher.try_run(|| panic!("second"));
        catcher.try_run(|| ());
        assert_eq!(catcher.recovered().as_deref(), Some("first"));
    }

    #[test]
    fn test_take_resets_slot() {
        let catcher = Catcher::new();
        catcher.try_run(|| panic!("first"));
        assert!(catcher.take().is_some());
        assert!(catcher.take().is_none());
        catcher.try_run(|| panic!("second"));
        assert_eq!(catcher.recovered().as_deref(), Some("second"));
    }

    #[test]
    fn test_share_keeps_panic_captured() {
        let catcher = Catcher::new();
        catcher.try_run(|| panic!("shared failure"));

        let first = catcher.share().unwrap();
        assert_eq!(first.into_payload().downcast_ref::<&str>(), Some(&"shared failure"));

        let second = catcher.share().unwrap();
        assert_eq!(second.message(), "shared failure");
        assert_eq!(
            second.into_payload().downcast_ref::<String>().map(String::as_str),
            Some("shared failure")
        );
        assert!(catcher.has_panicked());
    }

    #[test]
    fn test_display_contains_message_and_thread() {
        let caught = Panic::from_message("broken invariant");
        let text = caught.to_string();
        assert!(text.contains("broken invariant"), "{}", text);
        assert!(text.starts_with("panic in "), "{}", text);
    }

    #[test]
    #[should_panic(expected = "resumed payload")]
    fn test_repanic_resumes_original_payload() {
        let catcher = Catcher::new();
        catcher.try_run(|| panic!("resumed payload"));
        catcher.repanic();
    }

    #[test]
    fn test_repanic_without_panic_is_noop() {
        Catcher::new().repanic();
    }

    #[test]
    fn test_panic_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Panic>();
        assert_send_sync::<Catcher>();
    }
}
