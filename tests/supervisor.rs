use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use workvisor::{
    Admission, Event, EventKind, ListenFn, RuntimeError, StopFn, Subscribe, Supervisor,
    SupervisorConfig, TaskError, TaskFn, TaskRef, WorkerOptions, WorkerSpec, WorkerState,
};

const TICK: Duration = Duration::from_millis(5);

fn config() -> SupervisorConfig {
    SupervisorConfig {
        poll_interval: TICK,
        max_concurrency_wait: Duration::from_millis(2),
        grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    }
}

fn supervisor() -> Arc<Supervisor> {
    Supervisor::builder(config()).build()
}

fn counter(hits: &Arc<AtomicUsize>) -> TaskRef {
    let hits = Arc::clone(hits);
    TaskFn::arc("counter", move |_ctx: CancellationToken| {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn hold() -> ListenFn {
    ListenFn::new(|| false)
}

#[derive(Default)]
struct Collect(Mutex<Vec<Event>>);

impl Collect {
    fn kinds(&self, label: &str) -> Vec<EventKind> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.worker.as_deref() == Some(label))
            .map(|e| e.kind)
            .collect()
    }
}

#[async_trait]
impl Subscribe for Collect {
    async fn on_event(&self, e: &Event) {
        self.0.lock().unwrap().push(e.clone());
    }
}

#[tokio::test]
async fn run_once_job_counts_once() {
    let sup = supervisor();
    let total = Arc::new(AtomicUsize::new(0));

    let w = sup
        .run(counter(&total), WorkerOptions::labeled("job1"))
        .await
        .unwrap();
    w.join().await.unwrap();

    assert_eq!(total.load(Ordering::SeqCst), 1);
    assert_eq!(w.invocations(), 1);
    assert!(w.is_triggered());
    assert!(sup.get("job1").is_none());
}

#[tokio::test]
async fn back_to_back_runs_on_one_label_count_twice() {
    let sup = supervisor();
    let mut rx = sup.bus().subscribe();
    let total = Arc::new(AtomicUsize::new(0));

    sup.run(counter(&total), WorkerOptions::labeled("job1"))
        .await
        .unwrap();
    let second = sup
        .run(counter(&total), WorkerOptions::labeled("job1"))
        .await
        .unwrap();
    second.join().await.unwrap();

    assert_eq!(total.load(Ordering::SeqCst), 2);

    let mut live = 0i32;
    while let Ok(ev) = rx.try_recv() {
        match ev.kind {
            EventKind::WorkerRegistered => live += 1,
            EventKind::WorkerStopped => live -= 1,
            _ => continue,
        }
        assert!((0..=1).contains(&live), "two workers held job1 at once");
    }
    assert_eq!(live, 0);
}

#[tokio::test]
async fn replace_joins_old_worker_before_new_payload() {
    let sup = supervisor();
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let slow = {
        let log = Arc::clone(&log);
        TaskFn::arc("slow", move |_ctx: CancellationToken| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("old:start");
                tokio::time::sleep(Duration::from_millis(40)).await;
                log.lock().unwrap().push("old:end");
                Ok(())
            }
        })
    };
    let fast = {
        let log = Arc::clone(&log);
        TaskFn::arc("fast", move |_ctx: CancellationToken| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("new");
                Ok(())
            }
        })
    };

    let old = sup.run(slow, WorkerOptions::labeled("slot")).await.unwrap();
    let new = sup.run(fast, WorkerOptions::labeled("slot")).await.unwrap();
    new.join().await.unwrap();

    assert_eq!(old.state(), WorkerState::Stopped);
    assert_ne!(old.id(), new.id());
    assert_eq!(*log.lock().unwrap(), vec!["old:start", "old:end", "new"]);
}

#[tokio::test]
async fn replace_leaves_exactly_one_live_worker() {
    let sup = supervisor();
    let first = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("w"))
        .await
        .unwrap();
    let second = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("w"))
        .await
        .unwrap();

    assert!(!first.is_alive());
    assert!(second.is_alive());
    assert_eq!(sup.list(), vec!["w"]);
    assert_eq!(sup.get("w").map(|w| w.id()), Some(second.id()));
    sup.stop_all().await.unwrap();
}

#[tokio::test]
async fn reject_and_keep_existing_admission() {
    let sup = supervisor();
    let live = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("w"))
        .await
        .unwrap();

    let err = sup
        .run(
            counter(&Arc::default()),
            WorkerOptions::labeled("w").with_admission(Admission::Reject),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::LabelInUse { .. }));

    let kept = sup
        .run(
            counter(&Arc::default()),
            WorkerOptions::labeled("w").with_admission(Admission::KeepExisting),
        )
        .await
        .unwrap();
    assert_eq!(kept.id(), live.id());
    assert!(live.is_alive());
    sup.stop_all().await.unwrap();
}

#[tokio::test]
async fn one_shot_fires_exactly_once_until_reset() {
    let sup = supervisor();
    let hits = Arc::new(AtomicUsize::new(0));

    let w = sup
        .one_shot(counter(&hits), ListenFn::always(), WorkerOptions::labeled("once"))
        .await
        .unwrap();

    tokio::time::sleep(TICK * 12).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(w.is_triggered());

    w.reset();
    tokio::time::sleep(TICK * 12).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    w.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_shot_runs_alternate_once_triggered() {
    let sup = supervisor();
    let hits = Arc::new(AtomicUsize::new(0));
    let alt = Arc::new(AtomicUsize::new(0));

    let w = sup
        .one_shot(
            counter(&hits),
            ListenFn::always(),
            WorkerOptions::labeled("once").with_alternate(counter(&alt)),
        )
        .await
        .unwrap();
    tokio::time::sleep(TICK * 12).await;
    w.shutdown().await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(alt.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn pause_blocks_payload_until_resumed() {
    let sup = supervisor();
    let hits = Arc::new(AtomicUsize::new(0));
    let w = sup
        .listen(counter(&hits), ListenFn::always(), WorkerOptions::labeled("l"))
        .await
        .unwrap();

    tokio::time::sleep(TICK * 6).await;
    w.pause(true);
    assert_eq!(w.state(), WorkerState::Paused);
    tokio::time::sleep(TICK * 3).await;

    let frozen = hits.load(Ordering::SeqCst);
    assert!(frozen > 0);
    tokio::time::sleep(TICK * 10).await;
    assert_eq!(hits.load(Ordering::SeqCst), frozen);

    w.pause(false);
    tokio::time::sleep(TICK * 10).await;
    assert!(hits.load(Ordering::SeqCst) > frozen);
    w.shutdown().await.unwrap();
}

#[tokio::test]
async fn pause_all_reaches_every_worker() {
    let sup = supervisor();
    let a = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("a"))
        .await
        .unwrap();
    let b = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("b"))
        .await
        .unwrap();

    sup.pause_all(true);
    assert!(a.is_paused() && b.is_paused());
    sup.pause_all(false);
    assert!(!a.is_paused() && !b.is_paused());
    sup.stop_all().await.unwrap();
}

#[tokio::test]
async fn stop_is_idempotent_and_join_is_bounded() {
    let sup = supervisor();
    let hits = Arc::new(AtomicUsize::new(0));
    let stops = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&stops);

    let w = sup
        .listen(
            counter(&hits),
            ListenFn::always(),
            WorkerOptions::labeled("l")
                .with_poll_interval(Duration::from_millis(20))
                .with_stop(StopFn::new(move || {
                    s.fetch_add(1, Ordering::SeqCst);
                })),
        )
        .await
        .unwrap();

    w.stop();
    w.stop();
    assert!(w.join_timeout(Duration::from_millis(120)).await);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    let after = hits.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(hits.load(Ordering::SeqCst), after);
    assert!(sup.get("l").is_none());
}

#[tokio::test]
async fn stop_interrupts_paused_worker() {
    let sup = supervisor();
    let w = sup
        .listen(counter(&Arc::default()), ListenFn::always(), WorkerOptions::labeled("p"))
        .await
        .unwrap();
    w.pause(true);
    w.stop();
    assert!(w.join_timeout(Duration::from_millis(100)).await);
}

#[tokio::test]
async fn failed_payload_is_cleaned_up() {
    let sup = supervisor();
    let failing: TaskRef = TaskFn::arc("failing", |_ctx: CancellationToken| async {
        Err(TaskError::fail("disk full"))
    });

    let w = sup.run(failing, WorkerOptions::labeled("f")).await.unwrap();
    assert_eq!(w.join().await, Err(TaskError::fail("disk full")));
    assert!(sup.get("f").is_none());
    assert_eq!(w.last_error(), Some(TaskError::fail("disk full")));
}

#[tokio::test]
async fn panicking_payload_is_cleaned_up() {
    let sup = supervisor();
    let boom: TaskRef = TaskFn::arc("boom", |_ctx: CancellationToken| async {
        if true {
            panic!("payload exploded");
        }
        Ok(())
    });

    let w = sup.run(boom, WorkerOptions::labeled("p")).await.unwrap();
    match w.join().await {
        Err(TaskError::Panicked { info }) => assert_eq!(info, "payload exploded"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(sup.get("p").is_none());
}

#[tokio::test]
async fn failing_listen_condition_ends_worker() {
    let sup = supervisor();
    let w = sup
        .listen(
            counter(&Arc::default()),
            ListenFn::fallible(|| Err(TaskError::fail("sensor offline"))),
            WorkerOptions::labeled("l"),
        )
        .await
        .unwrap();

    assert!(w.join().await.is_err());
    assert!(sup.get("l").is_none());
}

#[tokio::test]
async fn payload_timeout_ends_worker() {
    let sup = supervisor();
    let slow: TaskRef = TaskFn::arc("slow", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Err(TaskError::Canceled)
    });

    let w = sup
        .run(
            slow,
            WorkerOptions::labeled("t").with_timeout(Duration::from_millis(10)),
        )
        .await
        .unwrap();
    assert_eq!(
        w.join().await,
        Err(TaskError::Timeout {
            timeout: Duration::from_millis(10)
        })
    );
}

#[tokio::test]
async fn spec_without_payload_is_a_no_op() {
    let sup = supervisor();
    let spawned = sup
        .spawn(WorkerSpec::empty().with_options(WorkerOptions::labeled("nothing")))
        .await
        .unwrap();
    assert!(spawned.is_none());
    assert!(sup.is_empty());
}

#[tokio::test]
async fn spawn_spec_picks_mode() {
    let sup = supervisor();
    let hits = Arc::new(AtomicUsize::new(0));
    let w = sup
        .spawn(
            WorkerSpec::run(counter(&hits))
                .with_one_shot(true)
                .with_options(WorkerOptions::labeled("spec")),
        )
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(TICK * 8).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    w.shutdown().await.unwrap();
}

#[tokio::test]
async fn soft_cap_delays_until_a_slot_frees() {
    let sup = Supervisor::builder(SupervisorConfig {
        max_concurrent: 1,
        ..config()
    })
    .build();
    let mut rx = sup.bus().subscribe();

    let first = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("a"))
        .await
        .unwrap();
    assert_eq!(sup.active(), 1);

    let hits = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&sup);
    let payload = counter(&hits);
    let pending =
        tokio::spawn(async move { s.run(payload, WorkerOptions::labeled("b")).await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!pending.is_finished());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    first.shutdown().await.unwrap();
    let second = pending.await.unwrap().unwrap();
    second.join().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let mut delayed = false;
    while let Ok(ev) = rx.try_recv() {
        delayed |= ev.kind == EventKind::AdmissionDelayed && ev.worker.as_deref() == Some("b");
    }
    assert!(delayed);
}

#[tokio::test]
async fn hooks_run_around_payload() {
    let sup = supervisor();
    let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let step = |name: &'static str| -> TaskRef {
        let order = Arc::clone(&order);
        TaskFn::arc(name, move |_ctx: CancellationToken| {
            let order = Arc::clone(&order);
            async move {
                order.lock().unwrap().push(name);
                Ok(())
            }
        })
    };

    let w = sup
        .run(
            step("payload"),
            WorkerOptions::labeled("h")
                .with_pre_start(step("pre_start"))
                .with_post_start(step("post_start"))
                .with_pre(step("pre"))
                .with_post(step("post")),
        )
        .await
        .unwrap();
    w.join().await.unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["pre_start", "post_start", "pre", "payload", "post"]
    );
}

#[tokio::test]
async fn wait_idle_waits_for_non_daemons_only() {
    let sup = supervisor();
    sup.listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("daemon"))
        .await
        .unwrap();

    let slow: TaskRef = TaskFn::arc("slow", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(())
    });
    let fg = sup
        .run(slow, WorkerOptions::labeled("fg").with_daemon(false))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(1), sup.wait_idle())
        .await
        .unwrap();
    assert!(!fg.is_alive());
    assert_eq!(sup.list(), vec!["daemon"]);
    sup.stop_all().await.unwrap();
    assert!(sup.is_empty());
}

#[tokio::test]
async fn subscribers_see_running_and_closing() {
    let collect = Arc::new(Collect::default());
    let sup = Supervisor::builder(config())
        .with_subscriber(collect.clone())
        .build();

    let w = sup
        .run(counter(&Arc::default()), WorkerOptions::labeled("obs"))
        .await
        .unwrap();
    w.join().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        collect.kinds("obs"),
        vec![
            EventKind::WorkerRegistered,
            EventKind::WorkerStarting,
            EventKind::PayloadInvoked,
            EventKind::WorkerStopped,
        ]
    );
}

#[tokio::test]
async fn refused_admission_skips_pre_start() {
    let sup = supervisor();
    let live = sup
        .listen(counter(&Arc::default()), hold(), WorkerOptions::labeled("w"))
        .await
        .unwrap();
    let pre_start = Arc::new(AtomicUsize::new(0));

    let err = sup
        .run(
            counter(&Arc::default()),
            WorkerOptions::labeled("w")
                .with_admission(Admission::Reject)
                .with_pre_start(counter(&pre_start)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::LabelInUse { .. }));

    let kept = sup
        .run(
            counter(&Arc::default()),
            WorkerOptions::labeled("w")
                .with_admission(Admission::KeepExisting)
                .with_pre_start(counter(&pre_start)),
        )
        .await
        .unwrap();
    assert_eq!(kept.id(), live.id());

    assert_eq!(pre_start.load(Ordering::SeqCst), 0);
    sup.stop_all().await.unwrap();
}

/// A task that stops the worker registered under `label`.
fn stop_worker(sup: &Arc<Supervisor>, label: &'static str) -> TaskRef {
    let sup = Arc::clone(sup);
    TaskFn::arc("stop_worker", move |_ctx: CancellationToken| {
        let sup = Arc::clone(&sup);
        async move {
            if let Some(w) = sup.get(label) {
                w.stop();
            }
            Ok(())
        }
    })
}

#[tokio::test]
async fn stop_in_pre_skips_payload() {
    let sup = supervisor();
    let hits = Arc::new(AtomicUsize::new(0));

    let w = sup
        .run(
            counter(&hits),
            WorkerOptions::labeled("guarded").with_pre(stop_worker(&sup, "guarded")),
        )
        .await
        .unwrap();
    w.join().await.unwrap();

    assert!(w.is_stop_requested());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(w.invocations(), 0);
    assert!(!w.is_triggered());
}

#[tokio::test]
async fn stop_in_payload_skips_post() {
    let sup = supervisor();
    let posts = Arc::new(AtomicUsize::new(0));

    let w = sup
        .run(
            stop_worker(&sup, "guarded"),
            WorkerOptions::labeled("guarded").with_post(counter(&posts)),
        )
        .await
        .unwrap();
    w.join().await.unwrap();

    assert!(w.is_stop_requested());
    assert!(w.is_triggered());
    assert_eq!(w.invocations(), 1);
    assert_eq!(posts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropping_supervisor_releases_subscribers() {
    let collect = Arc::new(Collect::default());
    let sup = Supervisor::builder(config())
        .with_subscriber(collect.clone())
        .build();

    let w = sup
        .run(counter(&Arc::default()), WorkerOptions::labeled("gone"))
        .await
        .unwrap();
    w.join().await.unwrap();
    drop(w);
    drop(sup);

    tokio::time::timeout(Duration::from_secs(1), async {
        while Arc::strong_count(&collect) > 1 {
            tokio::time::sleep(TICK).await;
        }
    })
    .await
    .unwrap();
    assert!(collect.kinds("gone").contains(&EventKind::WorkerStopped));
}
