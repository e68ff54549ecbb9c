//! Exclusive-mutation state container used by reducer-style workers

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared state container with exclusive mutation.
///
/// The store owns a value of `S` and exposes a single mutation operation,
/// [`Store::apply`], which runs a closure with exclusive access and returns
/// whatever the closure derives from the state. Cloning a store yields
/// another handle to the same state.
///
/// # Example
/// ```
/// use action_dispatch_core::Store;
///
/// #[derive(Default, Clone)]
/// struct Counter {
///     count: i32,
/// }
///
/// let store = Store::new(Counter::default());
/// let after = store.apply(|state| {
///     state.count += 1;
///     state.count
/// });
/// assert_eq!(after, 1);
/// assert_eq!(store.snapshot().count, 1);
/// ```
pub struct Store<S> {
    state: Arc<Mutex<S>>,
}

impl<S> Store<S> {
    /// Create a new store with initial state
    pub fn new(state: S) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Apply a mutation to the state and return a derived value
    ///
    /// The closure runs with exclusive access; do not call back into the
    /// same store from inside it.
    pub fn apply<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Read the state without mutating it
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

impl<S: Clone> Store<S> {
    /// Clone the current state out of the store
    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|state| f.debug_struct("Store").field("state", state).finish())
    }
}
