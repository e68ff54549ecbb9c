//! Declarative dispatcher wiring

use std::sync::Arc;

use crate::action::Action;
use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::middleware::Middleware;
use crate::reducer::{Reducer, ReducerWorker};
use crate::store::Store;
use crate::worker::Worker;

/// Builder for a [`Dispatcher`].
///
/// Middleware and workers keep the order in which they were added.
///
/// ```ignore
/// let counter = Store::new(0_i64);
/// let dispatcher = Dispatcher::builder()
///     .config(DispatcherConfig::default().with_max_depth(8))
///     .middleware(LoggingMiddleware::new())
///     .reducer(counter.clone(), reduce_counter)
///     .worker(PingWorker)
///     .build();
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    middlewares: Vec<Arc<dyn Middleware>>,
    workers: Vec<Arc<dyn Worker>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a middleware.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Add a worker.
    pub fn worker<W: Worker>(mut self, worker: W) -> Self {
        self.workers.push(Arc::new(worker));
        self
    }

    /// Add a [`ReducerWorker`] that applies `reducer` to `store`.
    pub fn reducer<S, A>(self, store: Store<S>, reducer: Reducer<S, A>) -> Self
    where
        S: Send + 'static,
        A: Action,
    {
        self.worker(ReducerWorker::new(store, reducer))
    }

    pub fn build(self) -> Dispatcher {
        let dispatcher = Dispatcher::with_config(self.config);
        for middleware in self.middlewares {
            dispatcher.register_shared_middleware(middleware);
        }
        for worker in self.workers {
            dispatcher.register_shared_worker(worker);
        }
        dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::NoopMiddleware;
    use crate::reducer::Reduction;

    #[derive(Clone, Debug)]
    enum CounterAction {
        Increment,
        Incremented,
    }

    impl Action for CounterAction {
        fn name(&self) -> &'static str {
            match self {
                CounterAction::Increment => "Increment",
                CounterAction::Incremented => "Incremented",
            }
        }
    }

    fn reduce(count: &mut u32, action: &CounterAction) -> Reduction<CounterAction> {
        match action {
            CounterAction::Increment => {
                *count += 1;
                Reduction::changed_with(CounterAction::Incremented)
            }
            CounterAction::Incremented => Reduction::unchanged(),
        }
    }

    #[test]
    fn test_build_registers_everything() {
        let dispatcher = DispatcherBuilder::new()
            .config(DispatcherConfig::default().with_max_redirects(2))
            .middleware(NoopMiddleware)
            .middleware(NoopMiddleware)
            .reducer(Store::new(0_u32), reduce)
            .build();

        assert_eq!(dispatcher.middleware_count(), 2);
        assert_eq!(dispatcher.worker_count(), 1);
        assert_eq!(dispatcher.config().max_redirects, 2);
    }

    #[tokio::test]
    async fn test_reducer_drives_store() {
        let counter = Store::new(0_u32);
        let dispatcher = Dispatcher::builder()
            .reducer(counter.clone(), reduce)
            .build();

        dispatcher
            .dispatch(CounterAction::Increment)
            .await
            .expect("dispatch");

        assert_eq!(counter.snapshot(), 1);
        assert_eq!(dispatcher.history().names(), vec!["Increment", "Incremented"]);
    }
}
