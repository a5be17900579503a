//! Two-phase handle for values a graph backend may compute lazily.

use crate::GraphError;
use std::fmt;

type Thunk<T> = Box<dyn FnOnce() -> Result<T, GraphError> + Send>;

/// A value that is either already materialized or still pending.
///
/// Accessors call [`Deferred::force`] before doing index arithmetic; forcing
/// blocks the calling thread until the backend has produced the value.
pub struct Deferred<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Ready(T),
    Pending(Thunk<T>),
}

impl<T> Deferred<T> {
    pub fn ready(value: T) -> Self {
        Self {
            inner: Inner::Ready(value),
        }
    }

    pub fn pending<F>(compute: F) -> Self
    where
        F: FnOnce() -> Result<T, GraphError> + Send + 'static,
    {
        Self {
            inner: Inner::Pending(Box::new(compute)),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.inner, Inner::Ready(_))
    }

    /// Materializes the value, running the pending computation if any.
    pub fn force(self) -> Result<T, GraphError> {
        match self.inner {
            Inner::Ready(v) => Ok(v),
            Inner::Pending(compute) => compute(),
        }
    }

    /// Chains a transformation without forcing.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        T: 'static,
        U: 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self.inner {
            Inner::Ready(v) => Deferred::ready(f(v)),
            Inner::Pending(compute) => Deferred::pending(move || compute().map(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Ready(v) => f.debug_tuple("Deferred::Ready").field(v).finish(),
            Inner::Pending(_) => f.write_str("Deferred::Pending"),
        }
    }
}
