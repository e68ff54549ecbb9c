//! Core traits and types for action-dispatch
//!
//! This crate provides an in-process, async action dispatch engine: actions
//! are fired through an ordered middleware pipeline and fanned out to every
//! registered worker concurrently; workers may answer with follow-up flows
//! that run recursively through the same pipeline.
//!
//! # Core Concepts
//!
//! - **Action**: a named unit of intent ([`Action`], erased as [`AnyAction`])
//! - **ActionFlow**: an ordered, immutable sequence of actions
//! - **Middleware**: intercepts (`pre`), observes (`post`) and reacts to
//!   failures (`failure`)
//! - **Worker**: executes actions and returns follow-up flows
//! - **Dispatcher**: owns the registries and the history; fires flows
//!
//! # Basic Example
//!
//! ```ignore
//! use action_dispatch_core::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum NetAction {
//!     Ping,
//!     Pong,
//! }
//!
//! struct PingWorker;
//!
//! #[async_trait]
//! impl Worker for PingWorker {
//!     async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
//!         match action.downcast_ref::<NetAction>() {
//!             Some(NetAction::Ping) => Ok(NetAction::Pong.into_flow()),
//!             _ => Ok(ActionFlow::empty()),
//!         }
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register_worker(PingWorker);
//!
//! dispatcher.dispatch(NetAction::Ping).await?;
//! assert_eq!(dispatcher.history().names(), vec!["Ping", "Pong"]);
//! ```
//!
//! # Reducer Pattern
//!
//! State changes go through a [`Store`] and a reducer wrapped in a
//! [`ReducerWorker`]. The reducer returns a [`Reduction`] whose follow-up
//! flow is fired like any other worker output:
//!
//! ```ignore
//! fn reducer(count: &mut i64, action: &CounterAction) -> Reduction<CounterAction> {
//!     match action {
//!         CounterAction::Increment => {
//!             *count += 1;
//!             Reduction::changed_with(CounterAction::DidIncrement)
//!         }
//!         CounterAction::DidIncrement => Reduction::unchanged(),
//!     }
//! }
//!
//! let counter = Store::new(0);
//! let dispatcher = Dispatcher::builder().reducer(counter.clone(), reducer).build();
//! ```

pub mod action;
pub mod builder;
pub mod completion;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod history;
pub mod logger;
pub mod middleware;
pub mod reducer;
pub mod store;
pub mod testing;
pub mod worker;

// Core trait exports
pub use action::{Action, AnyAction};
pub use flow::{ActionFlow, IntoActionFlow};
pub use middleware::{Interception, LoggingMiddleware, Middleware, NoopMiddleware};
pub use worker::{worker_fn, FnWorker, Worker};

// Engine exports
pub use builder::DispatcherBuilder;
pub use completion::Completion;
pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, ResetScope};
pub use error::{BoxError, DispatchError, DispatchOutcome, Panicked, SharedError};
pub use history::History;

// State exports
pub use reducer::{Reducer, ReducerWorker, Reduction};
pub use store::Store;

// Logging exports
pub use logger::{
    glob_match, ActionLog, ActionLogConfig, ActionLogEntry, ActionLoggerConfig,
    ActionLoggerMiddleware, ActionOutcome,
};

// Testing exports
pub use testing::{
    CountingWorker, FailingWorker, FollowUpWorker, HookCall, InjectedFailure, RecordingMiddleware,
};

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

pub use async_trait::async_trait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, AnyAction};
    pub use crate::builder::DispatcherBuilder;
    pub use crate::completion::Completion;
    pub use crate::config::DispatcherConfig;
    pub use crate::dispatcher::{Dispatcher, ResetScope};
    pub use crate::error::{BoxError, DispatchError, DispatchOutcome};
    pub use crate::flow::{ActionFlow, IntoActionFlow};
    pub use crate::history::History;
    pub use crate::logger::{ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::middleware::{Interception, LoggingMiddleware, Middleware, NoopMiddleware};
    pub use crate::reducer::{Reducer, ReducerWorker, Reduction};
    pub use crate::store::Store;
    pub use crate::worker::{worker_fn, Worker};

    pub use async_trait::async_trait;
}
