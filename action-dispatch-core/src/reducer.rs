//! Reducer-style workers
//!
//! A reducer is a plain function that mutates state in response to one
//! action type and may emit follow-up actions of the same family. Wrapping a
//! reducer and a [`Store`] in a [`ReducerWorker`] makes it a [`Worker`].
//!
//! # Example
//!
//! ```ignore
//! use action_dispatch::{Action, Reduction, ReducerWorker, Store};
//!
//! #[derive(Default)]
//! struct Cart { items: Vec<String>, saved: bool }
//!
//! #[derive(Clone, Debug, Action)]
//! enum CartAction {
//!     Add(String),
//!     Save,
//!     DidSave,
//! }
//!
//! fn reducer(state: &mut Cart, action: &CartAction) -> Reduction<CartAction> {
//!     match action {
//!         CartAction::Add(item) => {
//!             state.items.push(item.clone());
//!             Reduction::changed_with(CartAction::Save)
//!         }
//!         CartAction::Save => Reduction::unchanged(),
//!         CartAction::DidSave => {
//!             state.saved = true;
//!             Reduction::changed()
//!         }
//!     }
//! }
//!
//! let store = Store::new(Cart::default());
//! dispatcher.register_worker(ReducerWorker::new(store.clone(), reducer));
//! ```

use std::fmt;

use async_trait::async_trait;

use crate::action::{Action, AnyAction};
use crate::error::BoxError;
use crate::flow::ActionFlow;
use crate::store::Store;
use crate::worker::Worker;

/// Result of reducing one action.
///
/// Contains both the state change indicator and any follow-up actions.
#[derive(Debug, Clone)]
pub struct Reduction<A: Action> {
    /// Whether the state was modified by this action.
    pub changed: bool,
    /// Follow-up actions to fire after this one.
    pub follow_up: ActionFlow<A>,
}

impl<A: Action> Default for Reduction<A> {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl<A: Action> Reduction<A> {
    /// No state change and no follow-up.
    #[inline]
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            follow_up: ActionFlow::empty(),
        }
    }

    /// State changed, no follow-up.
    #[inline]
    pub fn changed() -> Self {
        Self {
            changed: true,
            follow_up: ActionFlow::empty(),
        }
    }

    /// No state change, one follow-up action.
    #[inline]
    pub fn follow(action: A) -> Self {
        Self {
            changed: false,
            follow_up: ActionFlow::from(action),
        }
    }

    /// State changed, with follow-up actions.
    #[inline]
    pub fn changed_with(follow_up: impl Into<ActionFlow<A>>) -> Self {
        Self {
            changed: true,
            follow_up: follow_up.into(),
        }
    }

    /// Append a follow-up action.
    #[inline]
    #[must_use]
    pub fn with(self, action: A) -> Self {
        Self {
            changed: self.changed,
            follow_up: self.follow_up.then(action),
        }
    }

    /// Set the changed flag to true.
    #[inline]
    #[must_use]
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    /// Returns true if there are follow-up actions.
    #[inline]
    pub fn has_follow_up(&self) -> bool {
        !self.follow_up.is_empty()
    }
}

/// A reducer function over state `S` and action family `A`.
pub type Reducer<S, A> = fn(&mut S, &A) -> Reduction<A>;

/// A worker that runs a reducer against a [`Store`].
///
/// Reacts only to actions whose payload is an `A`; everything else yields an
/// empty flow without touching the store.
pub struct ReducerWorker<S, A: Action> {
    store: Store<S>,
    reducer: Reducer<S, A>,
}

impl<S, A: Action> ReducerWorker<S, A> {
    /// Create a reducer worker.
    pub fn new(store: Store<S>, reducer: Reducer<S, A>) -> Self {
        Self { store, reducer }
    }

    /// The store the reducer mutates.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

impl<S, A: Action> fmt::Debug for ReducerWorker<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerWorker")
            .field("action", &std::any::type_name::<A>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S, A> Worker for ReducerWorker<S, A>
where
    S: Send + 'static,
    A: Action,
{
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        let Some(action) = action.downcast_ref::<A>() else {
            return Ok(ActionFlow::empty());
        };

        let reduction = self.store.apply(|state| (self.reducer)(state, action));
        tracing::trace!(
            action = %action.name(),
            changed = reduction.changed,
            follow_up = reduction.follow_up.len(),
            "Reduced action"
        );
        Ok(reduction.follow_up.erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        Reset,
        DidReset,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Decrement => "Decrement",
                TestAction::NoOp => "NoOp",
                TestAction::Reset => "Reset",
                TestAction::DidReset => "DidReset",
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Unrelated;

    impl Action for Unrelated {
        fn name(&self) -> &'static str {
            "Unrelated"
        }
    }

    #[derive(Default, Clone)]
    struct TestState {
        count: i32,
    }

    fn test_reducer(state: &mut TestState, action: &TestAction) -> Reduction<TestAction> {
        match action {
            TestAction::Increment => {
                state.count += 1;
                Reduction::changed()
            }
            TestAction::Decrement => {
                state.count -= 1;
                Reduction::changed()
            }
            TestAction::NoOp | TestAction::DidReset => Reduction::unchanged(),
            TestAction::Reset => {
                state.count = 0;
                Reduction::changed_with(TestAction::DidReset)
            }
        }
    }

    #[test]
    fn test_reduction_builders() {
        let r: Reduction<TestAction> = Reduction::unchanged();
        assert!(!r.changed);
        assert!(!r.has_follow_up());

        let r: Reduction<TestAction> = Reduction::changed();
        assert!(r.changed);
        assert!(!r.has_follow_up());

        let r = Reduction::follow(TestAction::NoOp);
        assert!(!r.changed);
        assert_eq!(r.follow_up.names(), vec!["NoOp"]);

        let r = Reduction::changed_with(vec![TestAction::Increment, TestAction::Decrement]);
        assert!(r.changed);
        assert_eq!(r.follow_up.len(), 2);
    }

    #[test]
    fn test_reduction_chaining() {
        let r: Reduction<TestAction> = Reduction::unchanged()
            .with(TestAction::Increment)
            .with(TestAction::NoOp)
            .mark_changed();
        assert!(r.changed);
        assert_eq!(r.follow_up.names(), vec!["Increment", "NoOp"]);
    }

    #[tokio::test]
    async fn test_reducer_worker_mutates_store() {
        let store = Store::new(TestState::default());
        let worker = ReducerWorker::new(store.clone(), test_reducer);

        for _ in 0..3 {
            let follow_up = worker
                .execute(&AnyAction::new(TestAction::Increment))
                .await
                .expect("execute");
            assert!(follow_up.is_empty());
        }
        worker
            .execute(&AnyAction::new(TestAction::Decrement))
            .await
            .expect("execute");

        assert_eq!(store.snapshot().count, 2);
    }

    #[tokio::test]
    async fn test_reducer_worker_returns_follow_up() {
        let store = Store::new(TestState { count: 7 });
        let worker = ReducerWorker::new(store.clone(), test_reducer);

        let follow_up = worker
            .execute(&AnyAction::new(TestAction::Reset))
            .await
            .expect("execute");

        assert_eq!(follow_up.names(), vec!["DidReset"]);
        assert_eq!(store.snapshot().count, 0);
    }

    #[tokio::test]
    async fn test_reducer_worker_ignores_other_families() {
        let store = Store::new(TestState { count: 5 });
        let worker = ReducerWorker::new(store.clone(), test_reducer);

        let follow_up = worker
            .execute(&AnyAction::new(Unrelated))
            .await
            .expect("execute");

        assert!(follow_up.is_empty());
        assert_eq!(store.snapshot().count, 5);
    }
}
