//! Middleware: pipeline stages that intercept, observe and react to failures

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::AnyAction;
use crate::error::{BoxError, DispatchError};
use crate::flow::{ActionFlow, IntoActionFlow};

/// What a middleware `pre` hook decided about an action.
#[derive(Debug, Clone, Default)]
pub enum Interception {
    /// Let the action through to the next hook and then to the workers
    #[default]
    Continue,
    /// Replace the action with this flow
    ///
    /// The flow's actions are processed in place of the intercepted action,
    /// ahead of the rest of the queue.
    Redirect(ActionFlow),
}

impl Interception {
    /// Redirect to a single action or a flow.
    pub fn redirect(to: impl IntoActionFlow) -> Self {
        Self::Redirect(to.into_flow())
    }

    /// Returns true for [`Interception::Continue`].
    #[inline]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Middleware trait for intercepting actions
///
/// Implement this trait to add logging, validation, routing or other
/// cross-cutting concerns to a dispatcher. Every hook has a default, so an
/// implementation only overrides what it needs.
///
/// Middleware is shared between concurrent `fire` invocations; keep any
/// state behind interior mutability.
///
/// # Hook order
///
/// - `pre` runs for every queued action, in registration order, before any
///   worker sees it. The first redirect or error stops the remaining `pre`
///   hooks for that action.
/// - `post` runs in registration order once the action and all follow-up
///   work it spawned succeeded.
/// - `failure` runs in registration order exactly once per failed
///   invocation, with the action that was active when the failure surfaced.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Called before an action is fanned out to workers
    async fn pre(&self, _action: &AnyAction) -> Result<Interception, BoxError> {
        Ok(Interception::Continue)
    }

    /// Called after an action completed successfully
    fn post(&self, _action: &AnyAction) {}

    /// Called when the invocation processing this action failed
    fn failure(&self, _action: &AnyAction, _error: &DispatchError) {}
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
        (**self).pre(action).await
    }

    fn post(&self, action: &AnyAction) {
        (**self).post(action);
    }

    fn failure(&self, action: &AnyAction, error: &DispatchError) {
        (**self).failure(action, error);
    }
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    /// Whether to log when an action enters the pipeline
    pub log_pre: bool,
    /// Whether to log when an action completes
    pub log_post: bool,
    /// Whether to log failures
    pub log_failure: bool,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (completions and failures)
    pub fn new() -> Self {
        Self {
            log_pre: false,
            log_post: true,
            log_failure: true,
        }
    }

    /// Create a logging middleware that logs every hook
    pub fn verbose() -> Self {
        Self {
            log_pre: true,
            log_post: true,
            log_failure: true,
        }
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
        if self.log_pre {
            tracing::debug!(action = %action.name(), "Dispatching action");
        }
        Ok(Interception::Continue)
    }

    fn post(&self, action: &AnyAction) {
        if self.log_post {
            tracing::debug!(action = %action.name(), "Action completed");
        }
    }

    fn failure(&self, action: &AnyAction, error: &DispatchError) {
        if self.log_failure {
            tracing::warn!(action = %action.name(), error = %error, "Action failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[derive(Clone, Debug)]
    enum TestAction {
        Foo,
        Bar,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Foo => "Foo",
                TestAction::Bar => "Bar",
            }
        }
    }

    struct RedirectFoo;

    #[async_trait]
    impl Middleware for RedirectFoo {
        async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
            match action.downcast_ref::<TestAction>() {
                Some(TestAction::Foo) => Ok(Interception::redirect(TestAction::Bar)),
                _ => Ok(Interception::Continue),
            }
        }
    }

    #[tokio::test]
    async fn test_default_hooks_continue() {
        let middleware = NoopMiddleware;
        let outcome = middleware
            .pre(&AnyAction::new(TestAction::Foo))
            .await
            .expect("pre");
        assert!(outcome.is_continue());
    }

    #[tokio::test]
    async fn test_redirect_builds_flow() {
        let outcome = RedirectFoo
            .pre(&AnyAction::new(TestAction::Foo))
            .await
            .expect("pre");

        match outcome {
            Interception::Redirect(flow) => assert_eq!(flow.names(), vec!["Bar"]),
            Interception::Continue => panic!("expected redirect"),
        }

        let outcome = RedirectFoo
            .pre(&AnyAction::new(TestAction::Bar))
            .await
            .expect("pre");
        assert!(outcome.is_continue());
    }

    #[tokio::test]
    async fn test_logging_middleware_never_intercepts() {
        let middleware = LoggingMiddleware::verbose();
        let action = AnyAction::new(TestAction::Foo);

        assert!(middleware.pre(&action).await.expect("pre").is_continue());
        middleware.post(&action);
        middleware.failure(&action, &DispatchError::Cancelled);
    }
}
