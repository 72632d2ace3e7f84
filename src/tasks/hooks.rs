//! # Synchronous hooks: listen condition and stop callback.
//!
//! - [`ListenFn`] is the condition a listen/one-shot worker polls on every tick.
//!   It is a plain predicate: it runs inline on the worker's routine and should be cheap.
//! - [`StopFn`] is invoked by the first [`Worker::stop`](crate::Worker::stop) call, on the
//!   caller's side, so it is synchronous as well.

use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;

type Predicate = dyn Fn() -> Result<bool, TaskError> + Send + Sync;

/// Condition polled by listen and one-shot workers.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use workvisor::ListenFn;
///
/// let dirty = Arc::new(AtomicBool::new(false));
/// let d = Arc::clone(&dirty);
/// let cond = ListenFn::new(move || d.load(Ordering::SeqCst));
///
/// assert_eq!(cond.check(), Ok(false));
/// dirty.store(true, Ordering::SeqCst);
/// assert_eq!(cond.check(), Ok(true));
/// ```
#[derive(Clone)]
pub struct ListenFn {
    f: Arc<Predicate>,
}

impl ListenFn {
    /// Wraps an infallible predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(move || Ok(f())),
        }
    }

    /// Wraps a predicate that may fail; an error ends the worker.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn() -> Result<bool, TaskError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Condition that is true on every tick.
    pub fn always() -> Self {
        Self::new(|| true)
    }

    /// Evaluates the condition once.
    pub fn check(&self) -> Result<bool, TaskError> {
        (self.f)()
    }
}

impl fmt::Debug for ListenFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ListenFn")
    }
}

/// Callback run once when a worker is asked to stop.
#[derive(Clone)]
pub struct StopFn {
    f: Arc<dyn Fn() + Send + Sync>,
}

impl StopFn {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub(crate) fn call(&self) {
        (self.f)()
    }
}

impl fmt::Debug for StopFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopFn")
    }
}
