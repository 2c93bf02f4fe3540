//! # Squares pipeline
//!
//! Demonstrates the basic workvisor flow:
//! - a producer, a pool of squarers and a printer connected by bounded queues
//! - pause/resume through the shared controller
//! - ordered shutdown (exit → drain downstream first → join)
//!
//! Run with: `cargo run --example squares`
//!
//! With `--features logging` the built-in `LogWriter` is attached as well and its records
//! are printed through `tracing_subscriber` (filter with `RUST_LOG`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use workvisor::{
    Config, Event, EventKind, Orchestrator, Subscribe, TaskError, WorkerContext, WorkerFn,
    WorkerRef,
};

/// Prints controller and lifecycle events.
struct Console;

#[async_trait]
impl Subscribe for Console {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::QueueDrained => println!(
                "[event] drained {:?} ({} items)",
                ev.queue.as_deref().unwrap_or("?"),
                ev.count.unwrap_or(0)
            ),
            EventKind::WorkerStarting | EventKind::WorkerStopped => println!(
                "[event] {:?} {}",
                ev.kind,
                ev.replica_label().unwrap_or_default()
            ),
            kind => println!("[event] {kind:?}"),
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Emits 0, 1, 2, ... until exit.
fn producer() -> WorkerRef<u64, (), u64> {
    WorkerFn::new("producer", |ctx: WorkerContext<u64, (), u64>| async move {
        let mut n = *ctx.args();
        while ctx.proceed().await {
            if ctx.outputs()[0].put_or_exit(n, ctx.controller()).await.is_err() {
                break;
            }
            n += 1;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok::<_, TaskError>(())
    })
    .into_ref()
}

/// Squares every input.
fn squarer() -> WorkerRef<(), u64, u64> {
    WorkerFn::new("squarer", |ctx: WorkerContext<(), u64, u64>| async move {
        while ctx.proceed().await {
            let Ok(n) = ctx.inputs()[0].get_or_exit(ctx.controller()).await else {
                break;
            };
            if ctx.outputs()[0]
                .put_or_exit(n * n, ctx.controller())
                .await
                .is_err()
            {
                break;
            }
        }
        Ok::<_, TaskError>(())
    })
    .into_ref()
}

/// Prints results.
fn printer() -> WorkerRef<(), u64, ()> {
    WorkerFn::new("printer", |ctx: WorkerContext<(), u64, ()>| async move {
        while ctx.proceed().await {
            match ctx.inputs()[0].get_or_exit(ctx.controller()).await {
                Ok(v) => println!("printer#{}: {v}", ctx.replica()),
                Err(_) => break,
            }
        }
        Ok::<_, TaskError>(())
    })
    .into_ref()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config {
        grace: Duration::from_secs(5),
        ..Config::default()
    };
    let builder = Orchestrator::builder(cfg).subscriber(Arc::new(Console));

    #[cfg(feature = "logging")]
    let builder = {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
        builder.subscriber(Arc::new(workvisor::LogWriter::new()))
    };

    let mut orch = builder.build();

    let numbers = orch.queue_default::<u64>("numbers");
    let squares = orch.queue_default::<u64>("squares");

    orch.add_workers(1, producer(), 1, vec![], vec![numbers.clone()])?;
    orch.add_workers(3, squarer(), (), vec![numbers], vec![squares.clone()])?;
    orch.add_workers(1, printer(), (), vec![squares], vec![])?;
    orch.start()?;

    tokio::time::sleep(Duration::from_secs(1)).await;
    println!("-- pause --");
    orch.controller().pause();
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("-- resume --");
    orch.controller().resume();
    tokio::time::sleep(Duration::from_secs(1)).await;

    orch.shutdown().await?;
    println!("-- done --");
    Ok(())
}
