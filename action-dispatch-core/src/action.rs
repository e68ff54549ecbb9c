//! Action trait and the type-erased action wrapper

use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Marker trait for actions that can be fired through a dispatcher
///
/// Actions represent intents. They should be:
/// - Clone: Actions are recorded in history and shared across workers
/// - Debug: For debugging and logging
/// - Send + Sync + 'static: Actions cross task boundaries during fan-out
///
/// Use `#[derive(Action)]` from `action-dispatch-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// Get the action name used for routing, matching and logging
    ///
    /// The name must be stable for a given type (or enum variant).
    fn name(&self) -> &'static str;
}

/// A type-erased action.
///
/// Holds the wrapped action behind an `Arc` together with its name, so
/// actions of unrelated types can share one flow, one history and one set of
/// workers. Workers match on [`AnyAction::name`] and read the payload through
/// the tag-guarded [`AnyAction::downcast_ref`].
///
/// Cloning is cheap: the payload is shared, never copied.
#[derive(Clone)]
pub struct AnyAction {
    name: &'static str,
    payload: Arc<dyn Payload>,
}

trait Payload: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Debug + Send + Sync> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AnyAction {
    /// Wrap an action.
    ///
    /// Wrapping a value that is already an `AnyAction` returns that wrapper
    /// unchanged instead of nesting it.
    pub fn new<A: Action>(action: A) -> Self {
        if let Some(erased) = (&action as &dyn Any).downcast_ref::<AnyAction>() {
            return erased.clone();
        }
        Self {
            name: action.name(),
            payload: Arc::new(action),
        }
    }

    /// The action name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if the payload is an `A`.
    pub fn is<A: Action>(&self) -> bool {
        (*self.payload).as_any().is::<A>()
    }

    /// Borrow the payload as an `A`, if that is what it holds.
    pub fn downcast_ref<A: Action>(&self) -> Option<&A> {
        // Deref first: `Arc<dyn Payload>` is itself a `Payload`.
        (*self.payload).as_any().downcast_ref::<A>()
    }

    /// Clone the payload out as an `A`, if that is what it holds.
    pub fn downcast<A: Action>(&self) -> Option<A> {
        self.downcast_ref::<A>().cloned()
    }

    /// Returns true if both wrappers share the same payload allocation.
    pub fn ptr_eq(&self, other: &AnyAction) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl Debug for AnyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.payload, f)
    }
}

impl fmt::Display for AnyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Action for AnyAction {
    fn name(&self) -> &'static str {
        self.name
    }
}
