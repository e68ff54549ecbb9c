//! Single-resolution completion of a `fire` invocation
//!
//! Every invocation resolves exactly once. The outcome travels through a
//! oneshot channel, so it can be consumed in whichever style suits the
//! caller:
//!
//! - `.await` the [`Completion`] (future style)
//! - [`Completion::wait`] from a non-async thread (blocking style)
//! - [`Completion::on_complete`] or
//!   [`Dispatcher::fire_with`](crate::Dispatcher::fire_with) (callback style)

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{DispatchError, DispatchOutcome};

/// Handle to the outcome of one `fire` invocation.
///
/// Resolves to `Ok(())` when every action in the flow (and all follow-up
/// work) completed, or to the invocation's [`DispatchError`]. If the
/// processing task disappears without reporting (runtime shutdown), the
/// completion resolves to [`DispatchError::Cancelled`] rather than hanging.
#[must_use = "a Completion does nothing unless awaited; use fire_and_forget to discard the outcome"]
pub struct Completion {
    rx: oneshot::Receiver<DispatchOutcome>,
}

impl Completion {
    /// Create a completion and the sender that resolves it.
    pub(crate) fn channel() -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel();
        (CompletionSender { tx }, Self { rx })
    }

    /// Block the current thread until the invocation completes.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context; `.await`
    /// the completion there instead.
    pub fn wait(self) -> DispatchOutcome {
        self.rx.blocking_recv().unwrap_or(Err(DispatchError::Cancelled))
    }

    /// Invoke `callback` with the outcome once the invocation completes.
    ///
    /// The callback runs on a spawned task and is called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn on_complete<F>(self, callback: F)
    where
        F: FnOnce(DispatchOutcome) + Send + 'static,
    {
        tokio::spawn(async move {
            callback(self.await);
        });
    }
}

impl Future for Completion {
    type Output = DispatchOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DispatchError::Cancelled)))
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// The resolving half of a [`Completion`].
pub(crate) struct CompletionSender {
    tx: oneshot::Sender<DispatchOutcome>,
}

impl CompletionSender {
    /// Resolve the completion. Consumes the sender, so it can only happen once.
    pub(crate) fn resolve(self, outcome: DispatchOutcome) {
        // The caller may have dropped the completion; nothing to deliver then.
        let _ = self.tx.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_await_resolves_with_outcome() {
        let (tx, completion) = Completion::channel();
        tx.resolve(Err(DispatchError::Timeout(Duration::from_millis(1))));

        let outcome = completion.await;
        assert!(matches!(outcome, Err(DispatchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_cancelled() {
        let (tx, completion) = Completion::channel();
        drop(tx);

        assert!(matches!(completion.await, Err(DispatchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_on_complete_invokes_callback_once() {
        let (tx, completion) = Completion::channel();
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

        completion.on_complete(move |outcome| {
            let _ = seen_tx.send(outcome.is_ok());
        });
        tx.resolve(Ok(()));

        let seen = tokio::time::timeout(Duration::from_millis(100), seen_rx.recv())
            .await
            .expect("timeout");
        assert_eq!(seen, Some(true));
        // Callback consumed its sender, so the channel closes after one value.
        assert_eq!(seen_rx.recv().await, None);
    }

    #[test]
    fn test_wait_blocks_until_resolved() {
        let (tx, completion) = Completion::channel();
        let resolver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            tx.resolve(Ok(()));
        });

        assert!(completion.wait().is_ok());
        resolver.join().expect("resolver thread");
    }
}
