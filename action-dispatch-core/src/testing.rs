//! Test utilities for action-dispatch applications
//!
//! - [`RecordingMiddleware`]: records every hook call for later assertions
//! - [`FailingWorker`], [`FollowUpWorker`], [`CountingWorker`]: small
//!   workers for exercising error paths, recursion and fan-out
//! - Assertion macros over a [`History`](crate::History) snapshot
//!
//! # Example
//!
//! ```ignore
//! use action_dispatch::testing::{FollowUpWorker, RecordingMiddleware};
//! use action_dispatch::{assert_history, Dispatcher};
//!
//! let recorder = RecordingMiddleware::new();
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .register_middleware(recorder.clone())
//!     .register_worker(FollowUpWorker::new().on("Ping", NetAction::Pong));
//!
//! dispatcher.dispatch(NetAction::Ping).await?;
//! assert_history!(dispatcher.history(), ["Ping", "Pong"]);
//! assert_eq!(recorder.post_names(), vec!["Pong", "Ping"]);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::action::AnyAction;
use crate::error::{BoxError, DispatchError};
use crate::flow::{ActionFlow, IntoActionFlow};
use crate::middleware::{Interception, Middleware};
use crate::worker::Worker;

/// One observed middleware hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    Pre(&'static str),
    Post(&'static str),
    /// Action name and the error's display text
    Failure(&'static str, String),
}

/// Middleware that records every hook call and never intercepts.
///
/// Clones share the same record, so keep one clone for assertions and
/// register the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingMiddleware {
    calls: Arc<Mutex<Vec<HookCall>>>,
}

impl RecordingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// All hook calls so far, in call order.
    pub fn calls(&self) -> Vec<HookCall> {
        lock(&self.calls).clone()
    }

    /// Names passed to `pre`, in call order.
    pub fn pre_names(&self) -> Vec<&'static str> {
        self.filter(|call| match call {
            HookCall::Pre(name) => Some(*name),
            _ => None,
        })
    }

    /// Names passed to `post`, in call order.
    pub fn post_names(&self) -> Vec<&'static str> {
        self.filter(|call| match call {
            HookCall::Post(name) => Some(*name),
            _ => None,
        })
    }

    /// `(action name, error text)` for every `failure` call.
    pub fn failures(&self) -> Vec<(&'static str, String)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                HookCall::Failure(name, error) => Some((*name, error.clone())),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    fn filter(&self, f: impl Fn(&HookCall) -> Option<&'static str>) -> Vec<&'static str> {
        lock(&self.calls).iter().filter_map(f).collect()
    }

    fn record(&self, call: HookCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Middleware for RecordingMiddleware {
    async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
        self.record(HookCall::Pre(action.name()));
        Ok(Interception::Continue)
    }

    fn post(&self, action: &AnyAction) {
        self.record(HookCall::Post(action.name()));
    }

    fn failure(&self, action: &AnyAction, error: &DispatchError) {
        self.record(HookCall::Failure(action.name(), error.to_string()));
    }
}

/// Error raised by [`FailingWorker`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct InjectedFailure {
    pub message: String,
}

/// Worker that fails on one action name and ignores everything else.
#[derive(Debug, Clone)]
pub struct FailingWorker {
    target: &'static str,
    message: String,
}

impl FailingWorker {
    /// Fail with `message` whenever an action named `target` arrives.
    pub fn on(target: &'static str, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Worker for FailingWorker {
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        if action.name() == self.target {
            return Err(Box::new(InjectedFailure {
                message: self.message.clone(),
            }));
        }
        Ok(ActionFlow::empty())
    }
}

/// Worker that answers action names with fixed follow-up flows.
#[derive(Debug, Clone, Default)]
pub struct FollowUpWorker {
    routes: HashMap<&'static str, ActionFlow>,
}

impl FollowUpWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `name` with `follow_up`.
    pub fn on(mut self, name: &'static str, follow_up: impl IntoActionFlow) -> Self {
        self.routes.insert(name, follow_up.into_flow());
        self
    }
}

#[async_trait]
impl Worker for FollowUpWorker {
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        Ok(self.routes.get(action.name()).cloned().unwrap_or_default())
    }
}

/// Worker that counts the actions it executes.
///
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct CountingWorker {
    count: Arc<AtomicUsize>,
}

impl CountingWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `execute` calls so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for CountingWorker {
    async fn execute(&self, _action: &AnyAction) -> Result<ActionFlow, BoxError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(ActionFlow::empty())
    }
}

/// Freeze tokio's clock for the current runtime.
///
/// Requires a current-thread runtime (the `#[tokio::test]` default).
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Move the frozen clock forward, firing any timers that come due.
#[cfg(feature = "testing-time")]
pub async fn advance_time(by: std::time::Duration) {
    tokio::time::advance(by).await;
}

/// Let tokio's clock run again.
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Assert that a history snapshot holds exactly these action names, in order.
///
/// # Example
///
/// ```ignore
/// use action_dispatch::assert_history;
///
/// assert_history!(dispatcher.history(), ["A1", "B1", "B2", "A3"]);
/// assert_history!(dispatcher.history(), []);
/// ```
#[macro_export]
macro_rules! assert_history {
    ($history:expr, [$($name:expr),* $(,)?]) => {{
        let expected: ::std::vec::Vec<&str> = ::std::vec![$($name),*];
        let actual = $history.names();
        assert_eq!(
            actual, expected,
            "History mismatch: expected {:?}, got {:?}",
            expected, actual
        );
    }};
}

/// Assert that no action with this name is in a history snapshot.
///
/// # Example
///
/// ```ignore
/// use action_dispatch::assert_not_in_history;
///
/// assert_not_in_history!(dispatcher.history(), "Foo");
/// ```
#[macro_export]
macro_rules! assert_not_in_history {
    ($history:expr, $name:expr) => {{
        let history = $history;
        assert!(
            !history.contains($name),
            "Expected `{}` NOT to be in history, but it was: {:?}",
            $name,
            history.names()
        );
    }};
}

/// Count how many actions with this name are in a history snapshot.
///
/// # Example
///
/// ```ignore
/// use action_dispatch::count_in_history;
///
/// assert_eq!(count_in_history!(dispatcher.history(), "Tick"), 3);
/// ```
#[macro_export]
macro_rules! count_in_history {
    ($history:expr, $name:expr) => {
        $history.count($name)
    };
}
