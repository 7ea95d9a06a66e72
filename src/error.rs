//! Error types for Fanout

use crate::panics::Panic;
use std::fmt;
use thiserror::Error;

/// Fanout errors
#[derive(Error, Debug)]
pub enum Error {
    /// A spawned task panicked
    ///
    /// **Triggered by:** Any panic inside work handed to a task group, pool or iterator
    /// **Example:** `group.spawn(|| panic!("bad state"))` followed by `group.join_safe()?`
    /// **Recovery:** The panic has already been contained; sibling tasks ran to completion
    #[error(transparent)]
    Panicked(#[from] Panic),

    /// The operating system refused to start a worker thread
    ///
    /// **Triggered by:** Thread limits or memory exhaustion while spawning
    /// **Surfaces as:** The message of the wave's captured [`Panic`]; spawning
    /// itself never fails, so the group reports it on join
    #[error("Failed to spawn task thread: {message}")]
    Spawn {
        /// Error reported by the OS
        message: String,
    },
}

impl Error {
    /// Create a spawn error from the underlying I/O error
    pub fn spawn(err: impl fmt::Display) -> Self {
        Error::Spawn {
            message: err.to_string(),
        }
    }

    /// Get the captured panic, if this error is one
    pub fn as_panic(&self) -> Option<&Panic> {
        match self {
            Error::Panicked(panic) => Some(panic),
            _ => None,
        }
    }
}

/// Result type for Fanout operations
pub type Result<T> = std::result::Result<T, Error>;

/// An ordered collection of errors reported by independent units of work.
///
/// Combining zero errors yields no error at all, so a `MultiError` always
/// holds at least one entry. Its `Display` output lists every error on its
/// own line in collection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiError<E> {
    errors: Vec<E>,
}

impl<E> MultiError<E> {
    /// Combine errors into one value, or `None` when there are none
    pub fn combine<I>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
    {
        let errors: Vec<E> = errors.into_iter().collect();
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// Combine errors into a `Result`: `Ok(())` when there are none
    pub fn into_result<I>(errors: I) -> std::result::Result<(), Self>
    where
        I: IntoIterator<Item = E>,
    {
        match Self::combine(errors) {
            Some(combined) => Err(combined),
            None => Ok(()),
        }
    }

    /// Append another error
    pub fn push(&mut self, err: E) {
        self.errors.push(err);
    }

    /// Number of underlying errors (always at least one)
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false; kept for symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Borrow the underlying errors in order
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// Iterate over the underlying errors in order
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    /// Take the underlying errors
    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }
}

impl<E> IntoIterator for MultiError<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a MultiError<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl<E: fmt::Display> fmt::Display for MultiError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl<E> std::error::Error for MultiError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}
