//! # Listen & Control Example
//!
//! An autosave worker that saves whenever a document is dirty, plus a one-shot
//! notifier, controlled from `main` while they run.
//!
//! Demonstrates:
//! - `listen` and `one_shot` workers
//! - Pausing, resetting and stopping a worker
//! - `stop_all` with a bounded grace period
//!
//! ## Run
//! ```bash
//! cargo run --example listen_control
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use workvisor::{
    ListenFn, LogWriter, StopFn, Supervisor, SupervisorConfig, TaskFn, TaskRef, WorkerOptions,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = SupervisorConfig {
        poll_interval: Duration::from_millis(100),
        grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::builder(cfg)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    let dirty = Arc::new(AtomicBool::new(false));
    let saves = Arc::new(AtomicUsize::new(0));

    // ============================================================
    // Demo 1: autosave while dirty
    // ============================================================
    let autosave = sup
        .listen(
            make_save(&dirty, &saves),
            flag(&dirty),
            WorkerOptions::labeled("autosave")
                .with_stop(StopFn::new(|| println!(" ─► autosave: stop requested"))),
        )
        .await?;

    let notified = Arc::new(AtomicBool::new(false));
    let notifier = sup
        .one_shot(
            TaskFn::arc("notify", |_ctx: CancellationToken| async {
                println!(" ─► notify: first save happened");
                Ok(())
            }),
            {
                let s = Arc::clone(&saves);
                ListenFn::new(move || s.load(Ordering::SeqCst) > 0)
            },
            WorkerOptions::labeled("notifier").with_post(TaskFn::arc("mark", {
                let n = Arc::clone(&notified);
                move |_ctx: CancellationToken| {
                    let n = Arc::clone(&n);
                    async move {
                        n.store(true, Ordering::SeqCst);
                        Ok(())
                    }
                }
            })),
        )
        .await?;

    println!(" ─► Editing...");
    dirty.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!(" ─► saves = {}", saves.load(Ordering::SeqCst));

    // ============================================================
    // Demo 2: pause blocks saving
    // ============================================================
    println!(" ─► Pausing autosave...");
    autosave.pause(true);
    dirty.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!(" ─► still dirty: {}", dirty.load(Ordering::SeqCst));
    autosave.pause(false);
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!(" ─► still dirty after resume: {}", dirty.load(Ordering::SeqCst));

    // ============================================================
    // Demo 3: re-arm the one-shot
    // ============================================================
    println!(" ─► notified = {}, re-arming...", notified.load(Ordering::SeqCst));
    notifier.reset();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // ============================================================
    // Demo 4: stop everything
    // ============================================================
    println!(" ─► Workers: {:?}", sup.list());
    sup.stop_all().await?;
    println!(" ─► Workers after stop_all: {:?}", sup.list());

    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

fn flag(flag: &Arc<AtomicBool>) -> ListenFn {
    let flag = Arc::clone(flag);
    ListenFn::new(move || flag.load(Ordering::SeqCst))
}

fn make_save(dirty: &Arc<AtomicBool>, saves: &Arc<AtomicUsize>) -> TaskRef {
    let dirty = Arc::clone(dirty);
    let saves = Arc::clone(saves);
    TaskFn::arc("save", move |_ctx: CancellationToken| {
        let dirty = Arc::clone(&dirty);
        let saves = Arc::clone(&saves);
        async move {
            dirty.store(false, Ordering::SeqCst);
            let n = saves.fetch_add(1, Ordering::SeqCst) + 1;
            println!(" ─► save #{n}");
            Ok(())
        }
    })
}
