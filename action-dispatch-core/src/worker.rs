//! Workers: consumers that execute actions and emit follow-up flows

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::AnyAction;
use crate::error::BoxError;
use crate::flow::ActionFlow;

/// A consumer of actions.
///
/// The dispatcher hands every action that clears middleware to every
/// registered worker; it does not filter. A worker that does not care about
/// an action must return an empty flow quickly and must not fail.
///
/// A non-empty returned flow is fired recursively through the whole
/// pipeline before the originating action is considered complete.
///
/// # Example
///
/// ```ignore
/// struct PingWorker;
///
/// #[async_trait]
/// impl Worker for PingWorker {
///     async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
///         match action.downcast_ref::<NetAction>() {
///             Some(NetAction::Ping) => Ok(NetAction::Pong.into_flow()),
///             _ => Ok(ActionFlow::empty()),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Execute an action, returning the follow-up flow to fire
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError>;
}

#[async_trait]
impl<W: Worker + ?Sized> Worker for Arc<W> {
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        (**self).execute(action).await
    }
}

/// A worker built from an async closure.
///
/// Created with [`worker_fn`].
pub struct FnWorker<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> fmt::Debug for FnWorker<F, Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWorker").finish_non_exhaustive()
    }
}

/// Build a worker from a closure returning a future.
///
/// The closure receives its own clone of the action, so the returned future
/// can be `'static`.
///
/// ```ignore
/// let echo = worker_fn(|action: AnyAction| async move {
///     if action.name() == "Ping" {
///         Ok(NetAction::Pong.into_flow())
///     } else {
///         Ok(ActionFlow::empty())
///     }
/// });
/// ```
pub fn worker_fn<F, Fut>(f: F) -> FnWorker<F, Fut>
where
    F: Fn(AnyAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionFlow, BoxError>> + Send + 'static,
{
    FnWorker {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> Worker for FnWorker<F, Fut>
where
    F: Fn(AnyAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionFlow, BoxError>> + Send + 'static,
{
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        (self.f)(action.clone()).await
    }
}
