//! End-to-end dispatch scenarios

use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_dispatch::prelude::*;
use action_dispatch::testing::{FailingWorker, RecordingMiddleware};
use action_dispatch::{assert_history, assert_not_in_history, context, ActionLog, ActionOutcome};

#[derive(Action, Clone, Debug, PartialEq)]
enum NetAction {
    Ping,
    Pong,
    Foo,
    Bar,
    Disconnect,
}

#[derive(Action, Clone, Debug)]
enum CounterAction {
    Increment,
    DidIncrement(i64),
}

struct PingWorker;

#[async_trait]
impl Worker for PingWorker {
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        match action.downcast_ref::<NetAction>() {
            Some(NetAction::Ping) => Ok(NetAction::Pong.into_flow()),
            _ => Ok(ActionFlow::empty()),
        }
    }
}

struct FooToBar;

#[async_trait]
impl Middleware for FooToBar {
    async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
        match action.downcast_ref::<NetAction>() {
            Some(NetAction::Foo) => Ok(Interception::redirect(NetAction::Bar)),
            _ => Ok(Interception::Continue),
        }
    }
}

/// Appends `"<tag>:<phase>:<action>"` to a shared trail.
struct Tagged {
    tag: &'static str,
    trail: Arc<Mutex<Vec<String>>>,
}

impl Tagged {
    fn push(&self, phase: &str, action: &AnyAction) {
        self.trail
            .lock()
            .expect("trail")
            .push(format!("{}:{phase}:{}", self.tag, action.name()));
    }
}

#[async_trait]
impl Middleware for Tagged {
    fn post(&self, action: &AnyAction) {
        self.push("post", action);
    }

    fn failure(&self, action: &AnyAction, _error: &DispatchError) {
        self.push("failure", action);
    }
}

fn failing_dispatcher(recorder: &RecordingMiddleware) -> Dispatcher {
    Dispatcher::builder()
        .middleware(recorder.clone())
        .worker(FailingWorker::on("Disconnect", "connection dropped"))
        .build()
}

fn count(total: &mut i64, action: &CounterAction) -> Reduction<CounterAction> {
    match action {
        CounterAction::Increment => {
            *total += 1;
            Reduction::changed_with(CounterAction::DidIncrement(*total))
        }
        CounterAction::DidIncrement(_) => Reduction::unchanged(),
    }
}

#[tokio::test]
async fn ping_yields_pong() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_worker(PingWorker);

    dispatcher.dispatch(NetAction::Ping).await.expect("dispatch");

    assert_history!(dispatcher.history(), ["Ping", "Pong"]);
}

#[tokio::test]
async fn foo_redirects_to_bar() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register_middleware(FooToBar)
        .register_worker(PingWorker);

    dispatcher
        .dispatch(ActionFlow::from(NetAction::Foo))
        .await
        .expect("dispatch");

    let history = dispatcher.history();
    assert_history!(history, ["Bar"]);
    assert_not_in_history!(&history, "Foo");
}

#[tokio::test]
async fn failing_worker_stops_the_flow() {
    let recorder = RecordingMiddleware::new();
    let dispatcher = Dispatcher::builder()
        .middleware(recorder.clone())
        .worker(PingWorker)
        .worker(FailingWorker::on("Disconnect", "connection dropped"))
        .build();

    let flow = ActionFlow::from(NetAction::Ping)
        .then(NetAction::Disconnect)
        .then(NetAction::Foo);
    let err = dispatcher.dispatch(flow).await.expect_err("should fail");

    assert_eq!(err.action_name(), Some("Disconnect"));
    assert_eq!(
        err.to_string(),
        "worker failed on `Disconnect`: connection dropped"
    );
    assert_history!(dispatcher.history(), ["Ping", "Pong"]);
    assert_eq!(recorder.failures(), vec![("Disconnect", err.to_string())]);
}

#[tokio::test]
async fn reducer_and_logger_work_together() {
    let counter = Store::new(0_i64);
    let logger = ActionLoggerMiddleware::with_default_log();
    let dispatcher = Dispatcher::builder()
        .middleware(logger.clone())
        .reducer(counter.clone(), count)
        .build();

    for _ in 0..3 {
        dispatcher
            .dispatch(CounterAction::Increment)
            .await
            .expect("dispatch");
    }

    assert_eq!(counter.snapshot(), 3);
    assert_eq!(dispatcher.history().count("DidIncrement"), 3);

    let log: ActionLog = logger.log().expect("log enabled");
    assert_eq!(log.len(), 6);
    assert!(log
        .entries()
        .all(|entry| entry.outcome == ActionOutcome::Completed));
}

#[tokio::test]
async fn callback_future_and_forget_agree() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_worker(PingWorker);

    let (tx, rx) = tokio::sync::oneshot::channel();
    dispatcher.fire_with(NetAction::Ping, move |outcome| {
        let _ = tx.send(outcome);
    });
    rx.await.expect("callback").expect("dispatch");

    dispatcher.fire(NetAction::Ping).await.expect("dispatch");

    dispatcher.fire_and_forget(NetAction::Ping);
    for _ in 0..200 {
        if dispatcher.history().len() == 6 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(dispatcher.history().count("Pong"), 3);
}

#[tokio::test]
async fn reset_clears_selected_parts() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register_middleware(LoggingMiddleware::verbose())
        .register_worker(PingWorker);
    dispatcher.dispatch(NetAction::Ping).await.expect("dispatch");

    dispatcher.reset(ResetScope::HISTORY | ResetScope::WORKERS);

    assert!(dispatcher.history().is_empty());
    assert_eq!(dispatcher.worker_count(), 0);
    assert_eq!(dispatcher.middleware_count(), 1);

    dispatcher.dispatch(NetAction::Ping).await.expect("dispatch");
    assert_history!(dispatcher.history(), ["Ping"]);
}

#[tokio::test]
async fn shared_middleware_registered_twice_runs_twice() {
    let recorder = Arc::new(RecordingMiddleware::new());
    let dispatcher = Dispatcher::new();
    dispatcher
        .register_middleware(Arc::clone(&recorder))
        .register_middleware(Arc::clone(&recorder));

    dispatcher.dispatch(NetAction::Bar).await.expect("dispatch");

    assert_eq!(recorder.pre_names(), vec!["Bar", "Bar"]);
    assert_eq!(recorder.post_names(), vec!["Bar", "Bar"]);
}

#[tokio::test]
async fn config_from_json_bounds_recursion() {
    let config = DispatcherConfig::from_json(r#"{ "max_depth": 1 }"#).expect("config");
    let dispatcher = Dispatcher::with_config(config);
    dispatcher.register_worker(worker_fn(|action: AnyAction| async move {
        Ok::<_, BoxError>(match action.downcast_ref::<NetAction>() {
            Some(NetAction::Ping) => NetAction::Pong.into_flow(),
            Some(NetAction::Pong) => NetAction::Foo.into_flow(),
            _ => ActionFlow::empty(),
        })
    }));

    let err = dispatcher.dispatch(NetAction::Ping).await.expect_err("too deep");
    assert!(matches!(
        err,
        DispatchError::DepthExceeded {
            action: "Pong",
            limit: 1
        }
    ));
}

#[tokio::test]
async fn scope_exposes_current_dispatcher() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_worker(PingWorker);

    let fired = dispatcher
        .scope(async {
            let current = context::current().expect("installed");
            current.dispatch(NetAction::Ping).await
        })
        .await;

    assert!(fired.is_ok());
    assert_history!(dispatcher.history(), ["Ping", "Pong"]);
}

#[test]
fn blocking_wait_from_plain_thread() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let dispatcher = Dispatcher::new();
    dispatcher.register_worker(PingWorker);

    let completion = {
        let _guard = runtime.enter();
        dispatcher.fire(NetAction::Ping)
    };

    assert!(completion.wait().is_ok());
    assert_history!(dispatcher.history(), ["Ping", "Pong"]);
}

#[tokio::test]
async fn failure_reaches_each_delivery_style_once() {
    let recorder = RecordingMiddleware::new();
    let dispatcher = failing_dispatcher(&recorder);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    dispatcher.fire_with(NetAction::Disconnect, move |outcome| {
        let _ = tx.send(outcome);
    });
    let err = rx.recv().await.expect("callback invoked").expect_err("should fail");
    assert_eq!(err.action_name(), Some("Disconnect"));
    assert!(rx.recv().await.is_none(), "callback invoked more than once");
    assert_eq!(recorder.failures().len(), 1);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    dispatcher
        .fire(NetAction::Disconnect)
        .on_complete(move |outcome| {
            let _ = tx.send(outcome);
        });
    let err = rx.recv().await.expect("on_complete invoked").expect_err("should fail");
    assert!(matches!(err, DispatchError::Worker { action: "Disconnect", .. }));
    assert!(rx.recv().await.is_none(), "on_complete invoked more than once");
    assert_eq!(recorder.failures().len(), 2);

    let err = dispatcher
        .fire(NetAction::Disconnect)
        .await
        .expect_err("should fail");
    assert_eq!(err.to_string(), "worker failed on `Disconnect`: connection dropped");
    assert_eq!(recorder.failures().len(), 3);
    assert_not_in_history!(dispatcher.history(), "Disconnect");
}

#[test]
fn blocking_wait_reports_failure() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let recorder = RecordingMiddleware::new();
    let dispatcher = failing_dispatcher(&recorder);

    let completion = {
        let _guard = runtime.enter();
        dispatcher.fire(ActionFlow::from(NetAction::Bar).then(NetAction::Disconnect))
    };

    let err = completion.wait().expect_err("should fail");
    assert_eq!(err.action_name(), Some("Disconnect"));
    assert_eq!(recorder.failures(), vec![("Disconnect", err.to_string())]);
    assert_history!(dispatcher.history(), ["Bar"]);
}

#[tokio::test]
async fn hooks_run_in_registration_order() {
    let trail = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::builder()
        .middleware(Tagged {
            tag: "first",
            trail: Arc::clone(&trail),
        })
        .middleware(Tagged {
            tag: "second",
            trail: Arc::clone(&trail),
        })
        .worker(FailingWorker::on("Disconnect", "connection dropped"))
        .build();

    dispatcher.dispatch(NetAction::Bar).await.expect("dispatch");
    dispatcher
        .dispatch(NetAction::Disconnect)
        .await
        .expect_err("should fail");

    assert_eq!(
        *trail.lock().expect("trail"),
        vec![
            "first:post:Bar",
            "second:post:Bar",
            "first:failure:Disconnect",
            "second:failure:Disconnect",
        ]
    );
}
