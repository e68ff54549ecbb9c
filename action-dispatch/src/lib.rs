//! action-dispatch: in-process async action dispatch
//!
//! Fire actions through an ordered middleware pipeline, fan them out to
//! every registered worker concurrently, and let workers answer with
//! follow-up flows that run recursively through the same pipeline.
//!
//! # Example
//! ```ignore
//! use action_dispatch::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum NetAction {
//!     Ping,
//!     Pong,
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register_worker(worker_fn(|action: AnyAction| async move {
//!     match action.downcast_ref::<NetAction>() {
//!         Some(NetAction::Ping) => Ok(NetAction::Pong.into_flow()),
//!         _ => Ok(ActionFlow::empty()),
//!     }
//! }));
//!
//! dispatcher.dispatch(NetAction::Ping).await?;
//! assert_eq!(dispatcher.history().names(), vec!["Ping", "Pong"]);
//! ```

// Re-export everything from core
pub use action_dispatch_core::*;

// Re-export derive macros
pub use action_dispatch_macros::Action;

// Re-export test assertion macros
pub use action_dispatch_core::{assert_history, assert_not_in_history, count_in_history};

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use action_dispatch_core::{Action, IntoActionFlow, Middleware, Worker};

    // Values
    pub use action_dispatch_core::{
        ActionFlow, AnyAction, BoxError, Completion, DispatchError, DispatchOutcome, History,
        Interception,
    };

    // Engine
    pub use action_dispatch_core::{Dispatcher, DispatcherBuilder, DispatcherConfig, ResetScope};

    // Workers & state
    pub use action_dispatch_core::{worker_fn, Reducer, ReducerWorker, Reduction, Store};

    // Middleware
    pub use action_dispatch_core::{
        ActionLoggerConfig, ActionLoggerMiddleware, LoggingMiddleware, NoopMiddleware,
    };

    // Derive macros
    pub use action_dispatch_macros::Action;

    pub use action_dispatch_core::async_trait;
}
