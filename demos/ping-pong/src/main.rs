//! Ping-pong demo
//!
//! Wires a reducer, a latency-simulating worker, a redirecting middleware and
//! the action logger into one dispatcher, then fires a few flows.
//!
//! Run with `RUST_LOG=debug cargo run -p ping-pong` to see the pipeline trace.

use std::time::Duration;

use action_dispatch::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Action, Clone, Debug)]
enum NetAction {
    Ping { seq: u32 },
    Pong { seq: u32 },
    /// Older clients still send this; it is rewritten to `Ping`
    LegacyPing,
    Disconnect,
}

#[derive(Debug, Default, Clone)]
struct Stats {
    pings: u32,
    pongs: u32,
}

fn reduce(stats: &mut Stats, action: &NetAction) -> Reduction<NetAction> {
    match action {
        NetAction::Ping { .. } => {
            stats.pings += 1;
            Reduction::changed()
        }
        NetAction::Pong { .. } => {
            stats.pongs += 1;
            Reduction::changed()
        }
        NetAction::LegacyPing | NetAction::Disconnect => Reduction::unchanged(),
    }
}

/// Answers every ping after a short round trip.
struct Echo {
    latency: Duration,
}

#[async_trait]
impl Worker for Echo {
    async fn execute(&self, action: &AnyAction) -> Result<ActionFlow, BoxError> {
        match action.downcast_ref::<NetAction>() {
            Some(NetAction::Ping { seq }) => {
                tokio::time::sleep(self.latency).await;
                Ok(NetAction::Pong { seq: *seq }.into_flow())
            }
            Some(NetAction::Disconnect) => Err("peer closed the connection".into()),
            _ => Ok(ActionFlow::empty()),
        }
    }
}

struct UpgradeLegacy;

#[async_trait]
impl Middleware for UpgradeLegacy {
    async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
        match action.downcast_ref::<NetAction>() {
            Some(NetAction::LegacyPing) => Ok(Interception::redirect(NetAction::Ping { seq: 0 })),
            _ => Ok(Interception::Continue),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ping_pong=info,action_dispatch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let stats = Store::new(Stats::default());
    let logger = ActionLoggerMiddleware::with_default_log();

    let dispatcher = Dispatcher::builder()
        .config(DispatcherConfig::default().with_timeout(Duration::from_secs(5)))
        .middleware(UpgradeLegacy)
        .middleware(LoggingMiddleware::new())
        .middleware(logger.clone())
        .reducer(stats.clone(), reduce)
        .worker(Echo {
            latency: Duration::from_millis(20),
        })
        .build();

    // Future style
    let flow = ActionFlow::from(NetAction::Ping { seq: 1 })
        .then(NetAction::LegacyPing)
        .then(NetAction::Ping { seq: 2 });
    dispatcher.dispatch(flow).await?;

    // Callback style
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    dispatcher.fire_with(NetAction::Ping { seq: 3 }, move |outcome| {
        let _ = done_tx.send(outcome);
    });
    done_rx.await??;

    // Failures surface to the caller and to every middleware
    if let Err(error) = dispatcher.dispatch(NetAction::Disconnect).await {
        tracing::info!(%error, "Disconnect failed as expected");
    }

    let snapshot = stats.snapshot();
    tracing::info!(
        pings = snapshot.pings,
        pongs = snapshot.pongs,
        history = ?dispatcher.history().names(),
        "Done"
    );

    if let Some(log) = logger.log() {
        for entry in log.recent(5) {
            tracing::info!(
                seq = entry.sequence,
                elapsed = %entry.elapsed_display(),
                outcome = ?entry.outcome,
                "{}",
                entry.summary
            );
        }
    }

    Ok(())
}
