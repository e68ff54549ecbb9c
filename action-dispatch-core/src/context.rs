//! Task-local access to the dispatcher driving the current task
//!
//! Every invocation runs with its dispatcher installed, so workers and
//! middleware can fire further work without holding a handle:
//!
//! ```ignore
//! if let Some(dispatcher) = context::current() {
//!     dispatcher.fire_and_forget(AuditAction::Recorded);
//! }
//! ```

use std::future::Future;

use crate::dispatcher::Dispatcher;

tokio::task_local! {
    static CURRENT: Dispatcher;
}

/// The dispatcher installed for the current task, if any.
pub fn current() -> Option<Dispatcher> {
    CURRENT.try_with(Dispatcher::clone).ok()
}

/// Returns true if a dispatcher is installed for the current task.
pub fn is_set() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Run `future` with `dispatcher` installed as the current dispatcher.
///
/// Scopes nest; the innermost dispatcher wins.
pub async fn scope<F: Future>(dispatcher: Dispatcher, future: F) -> F::Output {
    CURRENT.scope(dispatcher, future).await
}
