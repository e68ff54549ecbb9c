//! The dispatch engine
//!
//! A [`Dispatcher`] owns an ordered list of middleware, an ordered list of
//! workers and an append-only history. Firing a flow drains it front to
//! back; for every action:
//!
//! 1. `pre` hooks run in registration order. The first redirect splices the
//!    redirect flow in place of the action; the first error fails the
//!    invocation.
//! 2. Every worker executes the action concurrently. Each non-empty
//!    follow-up flow is drained recursively through the same pipeline, and
//!    the action waits for all of it.
//! 3. The action is committed to history and `post` hooks run in
//!    registration order.
//!
//! An action reserves its history position when it clears middleware, so a
//! parent is listed ahead of the follow-ups it spawned. It only becomes
//! visible once everything it spawned succeeded.
//!
//! A failure anywhere aborts the rest of the invocation. Failures travel up
//! the recursion as values; the failure hooks run once, at the top of the
//! invocation, with the action that was active when the failure surfaced.
//! A panicking worker or `pre` hook counts as that component failing.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use bitflags::bitflags;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::action::AnyAction;
use crate::completion::Completion;
use crate::config::DispatcherConfig;
use crate::context;
use crate::error::{BoxError, DispatchError, DispatchOutcome, Panicked};
use crate::flow::{ActionFlow, IntoActionFlow};
use crate::history::{History, Ledger, Slot};
use crate::middleware::{Interception, Middleware};
use crate::worker::Worker;

bitflags! {
    /// Which parts of a dispatcher [`Dispatcher::reset`] clears.
    ///
    /// Pending completions are cancelled regardless of the flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ResetScope: u8 {
        /// Clear the history.
        const HISTORY     = 0b0000_0001;
        /// Unregister all workers.
        const WORKERS     = 0b0000_0010;
        /// Unregister all middleware.
        const MIDDLEWARES = 0b0000_0100;
    }
}

/// The action dispatch engine.
///
/// Cloning a dispatcher yields another handle to the same registries and
/// history. All firing methods spawn onto the current tokio runtime.
///
/// # Example
///
/// ```ignore
/// let dispatcher = Dispatcher::new();
/// dispatcher
///     .register_middleware(LoggingMiddleware::new())
///     .register_worker(PingWorker);
///
/// dispatcher.dispatch(NetAction::Ping).await?;
/// assert_eq!(dispatcher.history().names(), vec!["Ping", "Pong"]);
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
    workers: RwLock<Vec<Arc<dyn Worker>>>,
    history: Mutex<Ledger>,
    cancel: Mutex<CancellationToken>,
    config: DispatcherConfig,
    next_invocation: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("middlewares", &self.middleware_count())
            .field("workers", &self.worker_count())
            .field("history", &lock(&self.inner.history).committed())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create an empty dispatcher with a configuration.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                middlewares: RwLock::new(Vec::new()),
                workers: RwLock::new(Vec::new()),
                history: Mutex::new(Ledger::default()),
                cancel: Mutex::new(CancellationToken::new()),
                config,
                next_invocation: AtomicU64::new(0),
            }),
        }
    }

    /// Start building a dispatcher declaratively.
    pub fn builder() -> crate::builder::DispatcherBuilder {
        crate::builder::DispatcherBuilder::new()
    }

    /// The configuration this dispatcher enforces.
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Append a middleware. Hooks run in registration order.
    ///
    /// No deduplication: registering the same (shared) middleware twice runs
    /// its hooks twice.
    pub fn register_middleware<M: Middleware>(&self, middleware: M) -> &Self {
        self.register_shared_middleware(Arc::new(middleware))
    }

    /// Append an already shared middleware.
    pub fn register_shared_middleware(&self, middleware: Arc<dyn Middleware>) -> &Self {
        write(&self.inner.middlewares).push(middleware);
        self
    }

    /// Append a worker.
    ///
    /// No deduplication: registering the same (shared) worker twice executes
    /// it twice per action.
    pub fn register_worker<W: Worker>(&self, worker: W) -> &Self {
        self.register_shared_worker(Arc::new(worker))
    }

    /// Append an already shared worker.
    pub fn register_shared_worker(&self, worker: Arc<dyn Worker>) -> &Self {
        write(&self.inner.workers).push(worker);
        self
    }

    /// Number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        read(&self.inner.middlewares).len()
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        read(&self.inner.workers).len()
    }

    // ------------------------------------------------------------------
    // History & reset
    // ------------------------------------------------------------------

    /// Snapshot of every action completed since creation or the last history reset.
    pub fn history(&self) -> History {
        lock(&self.inner.history).snapshot()
    }

    /// Clear the parts named by `scope` and cancel every pending completion.
    ///
    /// Invocations fired before the reset stop at their next suspension
    /// point and resolve with [`DispatchError::Cancelled`]; they append
    /// nothing further to history. Invocations fired afterwards are
    /// unaffected.
    pub fn reset(&self, scope: ResetScope) {
        let previous = std::mem::take(&mut *lock(&self.inner.cancel));
        previous.cancel();

        if scope.contains(ResetScope::HISTORY) {
            lock(&self.inner.history).clear();
        }
        if scope.contains(ResetScope::WORKERS) {
            write(&self.inner.workers).clear();
        }
        if scope.contains(ResetScope::MIDDLEWARES) {
            write(&self.inner.middlewares).clear();
        }
        tracing::debug!(?scope, "Dispatcher reset");
    }

    /// Clear history, workers and middleware, and cancel pending completions.
    pub fn reset_all(&self) {
        self.reset(ResetScope::all());
    }

    // ------------------------------------------------------------------
    // Firing
    // ------------------------------------------------------------------

    /// Fire an action or flow and get a handle to its outcome.
    ///
    /// Processing starts immediately on a spawned task whether or not the
    /// completion is awaited.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn fire(&self, flow: impl IntoActionFlow) -> Completion {
        let (sender, completion) = Completion::channel();
        self.spawn(flow.into_flow(), move |outcome| sender.resolve(outcome));
        completion
    }

    /// Fire an action or flow and invoke `callback` exactly once with the outcome.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn fire_with<F>(&self, flow: impl IntoActionFlow, callback: F)
    where
        F: FnOnce(DispatchOutcome) + Send + 'static,
    {
        self.spawn(flow.into_flow(), callback);
    }

    /// Fire an action or flow and suspend until it completes.
    pub async fn dispatch(&self, flow: impl IntoActionFlow) -> DispatchOutcome {
        self.fire(flow).await
    }

    /// Fire an action or flow and discard the outcome.
    ///
    /// Never blocks. History, `post` and `failure` hooks behave exactly as
    /// for the awaited forms.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn fire_and_forget(&self, flow: impl IntoActionFlow) {
        self.spawn(flow.into_flow(), |outcome| {
            if let Err(error) = outcome {
                tracing::debug!(error = %error, "Fire-and-forget invocation did not complete");
            }
        });
    }

    /// Run `future` with this dispatcher installed as the task's current dispatcher.
    ///
    /// See [`context::current`].
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        context::scope(self.clone(), future).await
    }

    fn spawn<F>(&self, flow: ActionFlow, deliver: F)
    where
        F: FnOnce(DispatchOutcome) + Send + 'static,
    {
        let invocation = Invocation {
            id: self.inner.next_invocation.fetch_add(1, Ordering::Relaxed),
            inner: Arc::clone(&self.inner),
            token: lock(&self.inner.cancel).clone(),
        };
        let timeout = self.inner.config.timeout;
        let handle = self.clone();

        tracing::debug!(
            invocation = invocation.id,
            actions = ?flow.names(),
            "Firing flow"
        );

        tokio::spawn(async move {
            let token = invocation.token.clone();
            let run = context::scope(handle, with_timeout(timeout, invocation.run(flow)));
            let run = AssertUnwindSafe(run).catch_unwind();
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Err(DispatchError::Cancelled),
                outcome = run => outcome.unwrap_or_else(|payload| {
                    let panicked = Panicked::from_payload(payload);
                    tracing::error!(error = %panicked, "Hook panicked, invocation aborted");
                    Err(DispatchError::Aborted(panicked))
                }),
            };
            deliver(outcome);
        });
    }
}

async fn with_timeout<F>(timeout: Option<Duration>, run: F) -> DispatchOutcome
where
    F: Future<Output = DispatchOutcome>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .unwrap_or_else(|_| Err(DispatchError::Timeout(limit))),
        None => run.await,
    }
}

/// A failure on its way up to the top of an invocation.
struct Failure {
    action: AnyAction,
    error: DispatchError,
}

impl Failure {
    fn new(action: &AnyAction, error: DispatchError) -> Self {
        Self {
            action: action.clone(),
            error,
        }
    }
}

/// One top-level `fire` and everything it recursively spawns.
#[derive(Clone)]
struct Invocation {
    id: u64,
    inner: Arc<Inner>,
    token: CancellationToken,
}

impl Invocation {
    async fn run(self, flow: ActionFlow) -> DispatchOutcome {
        let Err(Failure { action, error }) = self.clone().drain(flow, 0).await else {
            tracing::debug!(invocation = self.id, "Flow completed");
            return Ok(());
        };

        if error.is_withdrawn() {
            return Err(error);
        }

        tracing::warn!(
            invocation = self.id,
            action = %action.name(),
            error = %error,
            "Flow failed"
        );
        for middleware in self.inner.middlewares() {
            middleware.failure(&action, &error);
        }
        Err(error)
    }

    /// Process a flow queue front to back.
    fn drain(self, flow: ActionFlow, depth: usize) -> BoxFuture<'static, Result<(), Failure>> {
        async move {
            let mut queue: VecDeque<AnyAction> = flow.iter().cloned().collect();
            let mut redirects = 0;

            while let Some(action) = queue.pop_front() {
                let middlewares = self.inner.middlewares();

                if let Interception::Redirect(redirect) = self.intercept(&middlewares, &action).await? {
                    redirects += 1;
                    if redirects > self.inner.config.max_redirects {
                        return Err(Failure::new(
                            &action,
                            DispatchError::RedirectLimit {
                                action: action.name(),
                                limit: self.inner.config.max_redirects,
                            },
                        ));
                    }
                    tracing::debug!(
                        invocation = self.id,
                        action = %action.name(),
                        to = ?redirect.names(),
                        "Redirected action"
                    );
                    for replacement in redirect.iter().rev() {
                        queue.push_front(replacement.clone());
                    }
                    continue;
                }

                let reservation = self.reserve(&action);
                self.fan_out(&action, depth).await?;
                reservation.commit(&action)?;
                for middleware in &middlewares {
                    middleware.post(&action);
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Run `pre` hooks in order until one redirects or fails.
    async fn intercept(
        &self,
        middlewares: &[Arc<dyn Middleware>],
        action: &AnyAction,
    ) -> Result<Interception, Failure> {
        for middleware in middlewares {
            let pre = AssertUnwindSafe(middleware.pre(action))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(caught(payload)));
            match pre {
                Ok(Interception::Continue) => {}
                Ok(redirect) => return Ok(redirect),
                Err(source) => {
                    return Err(Failure::new(
                        action,
                        DispatchError::middleware(action.name(), source),
                    ))
                }
            }
        }
        Ok(Interception::Continue)
    }

    /// Execute every worker concurrently and drain their follow-up flows.
    async fn fan_out(&self, action: &AnyAction, depth: usize) -> Result<(), Failure> {
        let workers = self.inner.workers();
        tracing::trace!(
            invocation = self.id,
            action = %action.name(),
            workers = workers.len(),
            depth,
            "Fanning out"
        );

        let branches = workers
            .into_iter()
            .map(|worker| self.clone().branch(worker, action.clone(), depth));

        try_join_all(branches).await.map(drop)
    }

    /// One worker's share of a fan-out: execute, then drain its follow-up flow.
    async fn branch(
        self,
        worker: Arc<dyn Worker>,
        action: AnyAction,
        depth: usize,
    ) -> Result<(), Failure> {
        let follow_up = AssertUnwindSafe(worker.execute(&action))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(caught(payload)))
            .map_err(|source| Failure::new(&action, DispatchError::worker(action.name(), source)))?;
        if follow_up.is_empty() {
            return Ok(());
        }

        let limit = self.inner.config.max_depth;
        if depth >= limit {
            return Err(Failure::new(
                &action,
                DispatchError::DepthExceeded {
                    action: action.name(),
                    limit,
                },
            ));
        }
        tracing::trace!(
            invocation = self.id,
            action = %action.name(),
            follow_up = ?follow_up.names(),
            "Firing follow-up flow"
        );
        self.drain(follow_up, depth + 1).await
    }

    fn reserve(&self, action: &AnyAction) -> Reservation<'_> {
        Reservation {
            slot: lock(&self.inner.history).reserve(action),
            invocation: self,
            settled: false,
        }
    }
}

/// A history position held while an action's fan-out runs.
///
/// Dropping it uncommitted (failure, timeout, cancellation) gives the
/// position up.
struct Reservation<'a> {
    invocation: &'a Invocation,
    slot: Slot,
    settled: bool,
}

impl Reservation<'_> {
    /// Make the action visible in history unless the invocation was cancelled.
    fn commit(mut self, action: &AnyAction) -> Result<(), Failure> {
        self.settled = true;
        let mut ledger = lock(&self.invocation.inner.history);
        if self.invocation.token.is_cancelled() {
            ledger.abandon(self.slot);
            return Err(Failure::new(action, DispatchError::Cancelled));
        }
        if ledger.commit(self.slot) {
            Ok(())
        } else {
            Err(Failure::new(action, DispatchError::Cancelled))
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.invocation.inner.history).abandon(self.slot);
        }
    }
}

impl Inner {
    fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
        read(&self.middlewares).clone()
    }

    fn workers(&self) -> Vec<Arc<dyn Worker>> {
        read(&self.workers).clone()
    }
}

fn caught(payload: Box<dyn std::any::Any + Send>) -> BoxError {
    Box::new(Panicked::from_payload(payload))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
