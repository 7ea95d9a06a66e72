//! Parallel map operations for Fanout
//!
//! Typed convenience layer over [`BoundedIterator`]. Results are written into
//! one cell per input index, so the output order always matches the input
//! order regardless of which worker finishes first.

use super::bounded::BoundedIterator;
use crate::error::MultiError;
use parking_lot::Mutex;

/// Configures the worker cap for map operations
///
/// The default value uses the host's available parallelism and is safe to
/// reuse and share between threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mapper {
    /// Underlying iterator, which carries the worker cap
    pub iterator: BoundedIterator,
}

impl From<BoundedIterator> for Mapper {
    fn from(iterator: BoundedIterator) -> Self {
        Self { iterator }
    }
}

impl Mapper {
    /// Create a mapper capped at `max_workers` (0 = host parallelism)
    pub fn new(max_workers: usize) -> Self {
        Self {
            iterator: BoundedIterator::new(max_workers),
        }
    }

    /// Apply `f` to every element of `input`, returning results in input order
    ///
    /// A panic in `f` is re-raised after every element has been processed.
    pub fn map<T, R, F>(&self, input: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        self.map_indexed(input.len(), |i| f(&input[i]))
    }

    /// Apply `f` to every element of `input`, keeping every value and every error
    ///
    /// `f` reports a value for each element and optionally an error alongside
    /// it. The returned values always have the input's length; the error side
    /// is `Ok(())` when no element reported an error, otherwise a
    /// [`MultiError`] holding every reported error in index order.
    ///
    /// # Example
    /// ```rust
    /// use fanout::Mapper;
    ///
    /// let (values, errors) = Mapper::new(2).map_err(&[1, 2, 3], |x| {
    ///     let err = (*x == 2).then(|| format!("{} is even", x));
    ///     (x * 2, err)
    /// });
    /// assert_eq!(values, vec![2, 4, 6]);
    /// assert_eq!(errors.unwrap_err().to_string(), "2 is even");
    /// ```
    pub fn map_err<T, R, E, F>(&self, input: &[T], f: F) -> (Vec<R>, Result<(), MultiError<E>>)
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> (R, Option<E>) + Sync,
    {
        let errors = Mutex::new(Vec::new());
        let values = self.map_indexed(input.len(), |i| {
            let (value, err) = f(&input[i]);
            if let Some(err) = err {
                errors.lock().push((i, err));
            }
            value
        });
        (values, combine_indexed(errors.into_inner()))
    }

    /// Apply a fallible `f` to every element of `input`
    ///
    /// Returns every value in input order when no element failed, otherwise
    /// every error in index order.
    pub fn try_map<T, R, E, F>(&self, input: &[T], f: F) -> Result<Vec<R>, MultiError<E>>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync,
    {
        let errors = Mutex::new(Vec::new());
        let values = self.map_indexed(input.len(), |i| match f(&input[i]) {
            Ok(value) => Some(value),
            Err(err) => {
                errors.lock().push((i, err));
                None
            }
        });
        combine_indexed(errors.into_inner())?;
        Ok(values.into_iter().flatten().collect())
    }

    fn map_indexed<R, F>(&self, len: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        let cells: Vec<Mutex<Option<R>>> = (0..len).map(|_| Mutex::new(None)).collect();
        self.iterator.for_each_indexed(len, |i| {
            let value = f(i);
            *cells[i].lock() = Some(value);
        });
        // for_each_indexed returns only once every index is written.
        cells.into_iter().filter_map(Mutex::into_inner).collect()
    }
}

fn combine_indexed<E>(mut errors: Vec<(usize, E)>) -> Result<(), MultiError<E>> {
    errors.sort_by_key(|(index, _)| *index);
    MultiError::into_result(errors.into_iter().map(|(_, err)| err))
}

/// Apply `f` to every element of `input` using the default worker cap
///
/// Uses at most the host's available parallelism. For a configurable cap, use
/// a [`Mapper`].
///
/// # Example
/// ```rust
/// let squares = fanout::map(&[1, 2, 3, 4], |x| x * x);
/// assert_eq!(squares, vec![1, 4, 9, 16]);
/// ```
pub fn map<T, R, F>(input: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    Mapper::default().map(input, f)
}

/// Apply `f` to every element of `input`, keeping every value and every error
///
/// Uses the default worker cap. See [`Mapper::map_err`].
pub fn map_err<T, R, E, F>(input: &[T], f: F) -> (Vec<R>, Result<(), MultiError<E>>)
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> (R, Option<E>) + Sync,
{
    Mapper::default().map_err(input, f)
}

/// Apply a fallible `f` to every element of `input`
///
/// Uses the default worker cap. See [`Mapper::try_map`].
pub fn try_map<T, R, E, F>(input: &[T], f: F) -> Result<Vec<R>, MultiError<E>>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    Mapper::default().try_map(input, f)
}
