use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use workvisor::{
    Arity, BoundedQueue, Config, Controller, CreationError, Event, EventKind, Orchestrator,
    ReplicaExit, Subscribe, TaskError, WorkerContext, WorkerFn, WorkerPool, WorkerRef,
    WorkerSpec,
};

fn squarer() -> WorkerRef<(), i64, i64> {
    WorkerFn::new("squarer", |ctx: WorkerContext<(), i64, i64>| async move {
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
    .expecting(Arity::new(1, 1))
    .into_ref()
}

#[derive(Default)]
struct Recorder(std::sync::Mutex<Vec<Event>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.0.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn squarer_pipeline_end_to_end() {
    let controller = Controller::new();
    let input = BoundedQueue::<i64>::named("numbers", 2);
    let output = BoundedQueue::<i64>::named("squares", 2);

    let spec = WorkerSpec::create(
        2,
        squarer(),
        (),
        vec![input.clone()],
        vec![output.clone()],
        controller.clone(),
    )
    .unwrap();
    let mut pool = WorkerPool::new(spec);
    pool.start_workers().unwrap();

    input.put(3).await.unwrap();
    input.put(4).await.unwrap();
    let mut got = vec![output.get().await.unwrap(), output.get().await.unwrap()];
    got.sort();
    assert_eq!(got, vec![9, 16]);

    controller.request_exit();
    output.drain_and_unblock();
    input.drain_and_unblock();
    let exits = timeout(Duration::from_secs(5), pool.join_workers())
        .await
        .expect("join must not hang")
        .unwrap();
    assert_eq!(exits, vec![ReplicaExit::Stopped, ReplicaExit::Stopped]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_replicas_spawns_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let target = WorkerFn::new("counted", move |_ctx: WorkerContext<(), (), ()>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, TaskError>(()) }
    })
    .into_ref();

    let mut orch = Orchestrator::new(Config::default());
    let err = orch.add_workers(0, target, (), vec![], vec![]).unwrap_err();
    assert_eq!(err, CreationError::InvalidReplicaCount { count: 0 });
    assert!(orch.start().is_err());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn queue_count_mismatch_is_invalid_target() {
    let controller = Controller::new();
    let q = BoundedQueue::<i64>::named("only", 1);
    let err = WorkerSpec::create(1, squarer(), (), vec![q], vec![], controller).unwrap_err();
    assert!(matches!(err, CreationError::InvalidTarget { ref name, .. } if name == "squarer"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pause_and_resume_reach_every_replica() {
    let mut orch = Orchestrator::new(Config::default());
    let ticks = orch.queue::<usize>("ticks", 0);

    let ticker = WorkerFn::new("ticker", |ctx: WorkerContext<(), (), usize>| async move {
        while ctx.proceed().await {
            let _ = ctx.outputs()[0].put(ctx.replica()).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok::<_, TaskError>(())
    })
    .into_ref();
    orch.add_workers(3, ticker, (), vec![], vec![ticks.clone()])
        .unwrap();
    orch.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    orch.controller().pause();
    // one in-flight iteration per replica may still land
    tokio::time::sleep(Duration::from_millis(50)).await;
    let frozen = ticks.len();
    assert!(frozen > 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ticks.len(), frozen);

    orch.controller().resume();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ticks.len() > frozen);

    timeout(Duration::from_secs(5), orch.shutdown())
        .await
        .expect("shutdown must not hang")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscribers_see_shutdown_sequence() {
    let recorder = Arc::new(Recorder::default());
    let mut orch = Orchestrator::builder(Config::default())
        .subscriber(recorder.clone())
        .build();

    let numbers = orch.queue::<i64>("numbers", 2);
    let squares = orch.queue::<i64>("squares", 2);
    orch.add_workers(2, squarer(), (), vec![numbers.clone()], vec![squares.clone()])
        .unwrap();
    orch.start().unwrap();

    numbers.put(5).await.unwrap();
    assert_eq!(squares.get().await.unwrap(), 25);
    orch.shutdown().await.unwrap();

    let kinds = recorder.kinds();
    let pos = |k: EventKind| kinds.iter().position(|x| *x == k).unwrap();
    assert!(pos(EventKind::ShutdownRequested) < pos(EventKind::ExitRequested));
    assert!(pos(EventKind::ExitRequested) < pos(EventKind::QueueDrained));
    assert_eq!(kinds.last(), Some(&EventKind::ShutdownComplete));

    let drained: Vec<String> = recorder
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind == EventKind::QueueDrained)
        .filter_map(|e| e.queue.as_deref().map(str::to_owned))
        .collect();
    assert_eq!(drained, vec!["squares".to_string(), "numbers".to_string()]);

    let started = kinds
        .iter()
        .filter(|k| **k == EventKind::WorkerStarting)
        .count();
    assert_eq!(started, 2);
}
