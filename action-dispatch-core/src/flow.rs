//! Ordered, immutable sequences of actions

use std::sync::Arc;

use crate::action::{Action, AnyAction};

/// An ordered sequence of actions of one action family.
///
/// Flows are immutable values: [`ActionFlow::then`] returns a new flow and
/// leaves the receiver untouched. The empty flow is the identity for
/// concatenation.
///
/// `ActionFlow<AnyAction>` (the default) is what dispatchers, workers and
/// middleware exchange; typed flows convert with [`ActionFlow::erase`].
///
/// # Example
///
/// ```
/// use action_dispatch_core::{Action, ActionFlow};
///
/// #[derive(Clone, Debug)]
/// enum Step { One, Two, Three }
///
/// impl Action for Step {
///     fn name(&self) -> &'static str {
///         match self {
///             Step::One => "One",
///             Step::Two => "Two",
///             Step::Three => "Three",
///         }
///     }
/// }
///
/// let first = ActionFlow::from(Step::One);
/// let all = first.then(Step::Two).then(ActionFlow::from(Step::Three));
///
/// assert_eq!(first.len(), 1);
/// assert_eq!(all.names(), vec!["One", "Two", "Three"]);
/// ```
#[derive(Clone, Debug)]
pub struct ActionFlow<A: Action = AnyAction> {
    actions: Arc<[A]>,
}

impl<A: Action> ActionFlow<A> {
    /// The empty flow.
    pub fn empty() -> Self {
        Self {
            actions: Arc::from(Vec::new()),
        }
    }

    /// Create a flow from actions in order.
    pub fn new(actions: impl IntoIterator<Item = A>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }

    /// Return a new flow with `next` appended after this flow's actions.
    ///
    /// `next` may be a single action or another flow.
    #[must_use]
    pub fn then(&self, next: impl Into<ActionFlow<A>>) -> Self {
        let next = next.into();
        if next.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return next;
        }
        Self {
            actions: self.iter().chain(next.iter()).cloned().collect(),
        }
    }

    /// Number of actions in the flow.
    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the flow has no actions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over the actions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, A> {
        self.actions.iter()
    }

    /// The action names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Action::name).collect()
    }

    /// Convert into a flow of type-erased actions.
    pub fn erase(&self) -> ActionFlow<AnyAction> {
        ActionFlow::new(self.iter().cloned().map(AnyAction::new))
    }
}

impl<A: Action> Default for ActionFlow<A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A: Action> From<A> for ActionFlow<A> {
    fn from(action: A) -> Self {
        Self::new([action])
    }
}

impl<A: Action> From<Vec<A>> for ActionFlow<A> {
    fn from(actions: Vec<A>) -> Self {
        Self {
            actions: Arc::from(actions),
        }
    }
}

impl<A: Action> FromIterator<A> for ActionFlow<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a, A: Action> IntoIterator for &'a ActionFlow<A> {
    type Item = &'a A;
    type IntoIter = std::slice::Iter<'a, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

/// Conversion into a type-erased flow.
///
/// Implemented for every [`Action`] (a one-action flow) and every
/// [`ActionFlow`], so dispatcher and middleware entry points accept either.
pub trait IntoActionFlow {
    /// Convert into a flow of type-erased actions.
    fn into_flow(self) -> ActionFlow<AnyAction>;
}

impl<A: Action> IntoActionFlow for A {
    fn into_flow(self) -> ActionFlow<AnyAction> {
        ActionFlow::from(AnyAction::new(self))
    }
}

impl<A: Action> IntoActionFlow for ActionFlow<A> {
    fn into_flow(self) -> ActionFlow<AnyAction> {
        self.erase()
    }
}

impl<A: Action> IntoActionFlow for Vec<A> {
    fn into_flow(self) -> ActionFlow<AnyAction> {
        self.into_iter().map(AnyAction::new).collect()
    }
}
