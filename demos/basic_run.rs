//! # Basic Run Example
//!
//! Runs a labeled job twice back to back, then a failing job.
//!
//! Demonstrates:
//! - Run-once workers and `join()`
//! - Replace-on-conflict: the second `run` on `job1` waits for the first
//! - A failing payload: the worker ends, its error is kept, the label is freed
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic_run
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use workvisor::{LogWriter, Supervisor, SupervisorConfig, TaskError, TaskFn, TaskRef, WorkerOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    // ============================================================
    // Demo 1: the same label twice
    // ============================================================
    let total = Arc::new(AtomicUsize::new(0));
    let job = make_job(&total);

    println!(" ─► Running 'job1' twice...");
    sup.run(Arc::clone(&job), WorkerOptions::labeled("job1")).await?;
    let second = sup.run(job, WorkerOptions::labeled("job1")).await?;
    second.join().await?;
    println!(" ─► total = {}", total.load(Ordering::SeqCst));

    // ============================================================
    // Demo 2: a payload that fails
    // ============================================================
    let broken: TaskRef = TaskFn::arc("broken", |_ctx: CancellationToken| async {
        Err(TaskError::fail("database unreachable"))
    });

    println!(" ─► Running 'broken'...");
    let w = sup.run(broken, WorkerOptions::labeled("broken")).await?;
    if let Err(e) = w.join().await {
        println!(" ─► 'broken' ended: {e}");
    }
    println!(" ─► Registered: {:?}", sup.list());

    // Let the log subscriber drain.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

fn make_job(total: &Arc<AtomicUsize>) -> TaskRef {
    let total = Arc::clone(total);
    TaskFn::arc("job", move |_ctx: CancellationToken| {
        let total = Arc::clone(&total);
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            total.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}
