//! Error types for dispatching

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by worker and middleware implementations.
///
/// Any `std::error::Error + Send + Sync` converts into it with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared error source carried by [`DispatchError`].
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by a `fire` invocation.
///
/// The same value is handed to every middleware's failure hook and to the
/// caller's completion, so it is cheap to clone.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// A worker failed while executing an action
    #[error("worker failed on `{action}`: {source}")]
    Worker {
        /// Name of the action the worker was executing
        action: &'static str,
        /// The worker's error
        source: SharedError,
    },

    /// A middleware `pre` hook rejected an action
    #[error("middleware rejected `{action}`: {source}")]
    Middleware {
        /// Name of the action being intercepted
        action: &'static str,
        /// The middleware's error
        source: SharedError,
    },

    /// Worker follow-up flows nested deeper than the configured limit
    #[error("follow-up flows nested deeper than {limit} levels at `{action}`")]
    DepthExceeded {
        /// Name of the action whose follow-up flow crossed the limit
        action: &'static str,
        /// The configured depth limit
        limit: usize,
    },

    /// A flow queue processed more redirects than the configured limit
    #[error("more than {limit} redirects while processing `{action}`")]
    RedirectLimit {
        /// Name of the action whose redirect crossed the limit
        action: &'static str,
        /// The configured redirect limit
        limit: usize,
    },

    /// The invocation did not finish within the configured timeout
    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),

    /// The invocation was cancelled before it completed
    ///
    /// Returned when the dispatcher is reset while the invocation is in
    /// flight, or when the processing task is torn down (runtime shutdown).
    #[error("dispatch cancelled")]
    Cancelled,

    /// A `post` or `failure` hook panicked, so the invocation could not settle
    #[error("dispatch aborted: {0}")]
    Aborted(Panicked),
}

/// A worker or middleware panic, caught and turned into an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&'static str>()
                .map_or_else(|| "unknown panic payload".to_string(), |s| (*s).to_string()),
        };
        Self { message }
    }
}

impl DispatchError {
    pub(crate) fn worker(action: &'static str, source: BoxError) -> Self {
        Self::Worker {
            action,
            source: Arc::from(source),
        }
    }

    pub(crate) fn middleware(action: &'static str, source: BoxError) -> Self {
        Self::Middleware {
            action,
            source: Arc::from(source),
        }
    }

    /// Name of the action the error is attributed to, if any.
    pub fn action_name(&self) -> Option<&'static str> {
        match self {
            Self::Worker { action, .. }
            | Self::Middleware { action, .. }
            | Self::DepthExceeded { action, .. }
            | Self::RedirectLimit { action, .. } => Some(*action),
            Self::Timeout(_) | Self::Cancelled | Self::Aborted(_) => None,
        }
    }

    /// Returns true if the invocation was withdrawn rather than failed.
    ///
    /// Withdrawn invocations do not run failure hooks.
    pub fn is_withdrawn(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled)
    }

    /// Downcast the underlying worker or middleware error.
    pub fn source_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Worker { source, .. } | Self::Middleware { source, .. } => {
                source.downcast_ref::<E>()
            }
            _ => None,
        }
    }
}

/// Convenience alias for dispatch results.
pub type DispatchOutcome = Result<(), DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_worker_error_message() {
        let err = DispatchError::worker("Ping", Box::new(Boom));
        assert_eq!(err.to_string(), "worker failed on `Ping`: boom");
        assert_eq!(err.action_name(), Some("Ping"));
        assert!(!err.is_withdrawn());
    }

    #[test]
    fn test_panic_payload_message() {
        let from_str = Panicked::from_payload(Box::new("boom"));
        assert_eq!(from_str.message, "boom");

        let from_string = Panicked::from_payload(Box::new(String::from("bang")));
        assert_eq!(from_string.to_string(), "panicked: bang");

        let opaque = Panicked::from_payload(Box::new(7_u8));
        assert_eq!(opaque.message, "unknown panic payload");
    }

    #[test]
    fn test_source_downcast() {
        let err = DispatchError::middleware("Foo", Box::new(Boom));
        assert_eq!(err.source_as::<Boom>(), Some(&Boom));

        let clone = err.clone();
        assert_eq!(clone.source_as::<Boom>(), Some(&Boom));
    }

    #[test]
    fn test_withdrawn_variants() {
        assert!(DispatchError::Cancelled.is_withdrawn());
        assert!(DispatchError::Timeout(Duration::from_millis(5)).is_withdrawn());
        assert_eq!(DispatchError::Cancelled.action_name(), None);
    }

    #[test]
    fn test_string_errors_box() {
        let source: BoxError = "plain message".into();
        let err = DispatchError::worker("Pong", source);
        assert_eq!(err.to_string(), "worker failed on `Pong`: plain message");
    }
}
