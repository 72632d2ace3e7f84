//! # WorkerRoutine: the state machine of a single worker.
//!
//! One routine runs per spawned worker, on its own tokio task. It owns the payload,
//! the listen condition and the routine-side hooks; the caller-side state (flags,
//! lifecycle phase, counters) lives in the shared [`Worker`] handle.
//!
//! ## Flow
//! ```text
//! [stop?] ─► gate.acquire ─► WorkerStarting ─► post_start ─► [stop?] ─► Running
//!
//! RunOnce:   fire()
//!
//! Listen / OneShot:
//! loop {
//!   ├─► sleep(poll_interval)           (select! with stop → exit)
//!   ├─► wait while paused              (stop → exit)
//!   ├─► listen() == false ─► continue
//!   ├─► OneShot && triggered ─► alternate (if any), [stop?], continue
//!   └─► fire(), [stop?]
//! }
//!
//! fire():  pre ─► [stop?] ─► payload ─► triggered = true ─► [stop?] ─► post
//! ```
//!
//! ## Exit
//! Whatever ends the routine (natural return, error, panic in user code, stop), the
//! [`ExitGuard`] runs on the way out: it gives back the concurrency slot, publishes
//! `WorkerStopped`, drops the registry entry if it still belongs to this worker and
//! moves the worker to `Stopped`, which releases every `join()`. `WorkerStopped` goes
//! out before the label is freed, so a successor's `WorkerRegistered` always follows it.
//!
//! Errors end the routine without retry. They are kept as the worker's `last_error`
//! and published as `WorkerFailed`; `TaskError::Canceled` counts as a graceful exit.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::select;

use crate::core::gate::Gate;
use crate::core::panic_message;
use crate::core::registry::Registry;
use crate::core::runner::invoke;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{ListenFn, Task, TaskRef};
use crate::worker::{Worker, WorkerMode, WorkerState};

/// Timing resolved against the supervisor config.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Timing {
    pub poll_interval: Duration,
    pub max_concurrency_wait: Duration,
    pub timeout: Option<Duration>,
}

/// Hooks executed on the routine side.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub post_start: Option<TaskRef>,
    pub pre: Option<TaskRef>,
    pub post: Option<TaskRef>,
    pub alternate: Option<TaskRef>,
}

pub(crate) struct WorkerRoutine {
    pub worker: Worker,
    pub payload: TaskRef,
    pub listen: Option<ListenFn>,
    pub timing: Timing,
    pub hooks: Hooks,
    pub registry: Arc<Registry>,
    pub gate: Arc<Gate>,
    pub bus: Bus,
}

impl WorkerRoutine {
    /// Runs the routine to completion. Never fails: errors are stored on the handle.
    pub(crate) async fn run(self) {
        let mut guard = ExitGuard {
            worker: self.worker.clone(),
            registry: Arc::clone(&self.registry),
            gate: Arc::clone(&self.gate),
            bus: self.bus.clone(),
            admitted: false,
        };

        if let Err(err) = self.drive(&mut guard.admitted).await {
            if !err.is_canceled() {
                self.bus.publish(
                    Event::new(EventKind::WorkerFailed)
                        .with_worker(self.worker.label_arc())
                        .with_invocation(self.worker.invocations())
                        .with_reason(err.to_string()),
                );
                self.worker.record_error(err);
            }
        }
    }

    async fn drive(&self, admitted: &mut bool) -> Result<(), TaskError> {
        let w = &self.worker;
        if w.is_stop_requested() {
            return Ok(());
        }
        w.advance(WorkerState::Starting);
        if !self
            .gate
            .acquire(w.label(), self.timing.max_concurrency_wait, w.token(), &self.bus)
            .await
        {
            return Ok(());
        }
        *admitted = true;

        self.bus.publish(
            Event::new(EventKind::WorkerStarting)
                .with_worker(w.label_arc())
                .with_active(self.gate.active()),
        );

        if let Some(hook) = &self.hooks.post_start {
            self.call(hook.as_ref()).await?;
        }
        if w.is_stop_requested() {
            return Ok(());
        }
        w.advance(WorkerState::Running);

        let Some(listen) = &self.listen else {
            return self.fire().await;
        };

        loop {
            select! {
                _ = tokio::time::sleep(self.timing.poll_interval) => {}
                _ = w.token().cancelled() => return Ok(()),
            }
            if !w.flags().wait_resumed().await {
                return Ok(());
            }
            if !check(listen)? {
                continue;
            }

            if w.mode() == WorkerMode::OneShot && w.is_triggered() {
                if let Some(alt) = &self.hooks.alternate {
                    self.call(alt.as_ref()).await?;
                    self.bus.publish(
                        Event::new(EventKind::AlternateInvoked).with_worker(w.label_arc()),
                    );
                }
            } else {
                self.fire().await?;
            }
            if w.is_stop_requested() {
                return Ok(());
            }
        }
    }

    /// One payload invocation with its `pre` / `post` hooks.
    async fn fire(&self) -> Result<(), TaskError> {
        let w = &self.worker;
        if let Some(pre) = &self.hooks.pre {
            self.call(pre.as_ref()).await?;
            if w.is_stop_requested() {
                return Ok(());
            }
        }

        invoke(
            self.payload.as_ref(),
            w.token(),
            self.timing.timeout,
            w.label(),
            &self.bus,
        )
        .await?;
        w.flags().set_triggered(true);
        let n = w.record_invocation();
        self.bus.publish(
            Event::new(EventKind::PayloadInvoked)
                .with_worker(w.label_arc())
                .with_invocation(n),
        );

        if w.is_stop_requested() {
            return Ok(());
        }
        if let Some(post) = &self.hooks.post {
            self.call(post.as_ref()).await?;
        }
        Ok(())
    }

    /// Hooks get no deadline; only the payload honours `timeout`.
    async fn call(&self, hook: &dyn Task) -> Result<(), TaskError> {
        invoke(hook, self.worker.token(), None, self.worker.label(), &self.bus).await
    }
}

/// Evaluates the listen condition, turning a panic into an error.
fn check(listen: &ListenFn) -> Result<bool, TaskError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| listen.check())).unwrap_or_else(|panic| {
        Err(TaskError::Panicked {
            info: panic_message(panic.as_ref()),
        })
    })
}

/// Cleanup that runs however the routine ends.
struct ExitGuard {
    worker: Worker,
    registry: Arc<Registry>,
    gate: Arc<Gate>,
    bus: Bus,
    admitted: bool,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.worker.advance(WorkerState::Stopping);
        if self.admitted {
            self.gate.release();
        }
        self.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_worker(self.worker.label_arc())
                .with_invocation(self.worker.invocations())
                .with_active(self.gate.active()),
        );
        self.registry
            .remove_if_same(self.worker.label(), self.worker.id());
        self.worker.advance(WorkerState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    use crate::tasks::TaskFn;

    fn counting(hits: &Arc<AtomicUsize>) -> TaskRef {
        let hits = Arc::clone(hits);
        TaskFn::arc("count", move |_ctx: CancellationToken| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn routine(
        worker: &Worker,
        payload: TaskRef,
        listen: Option<ListenFn>,
        hooks: Hooks,
        registry: &Arc<Registry>,
    ) -> WorkerRoutine {
        WorkerRoutine {
            worker: worker.clone(),
            payload,
            listen,
            timing: Timing {
                poll_interval: Duration::from_millis(5),
                max_concurrency_wait: Duration::from_millis(5),
                timeout: None,
            },
            hooks,
            registry: Arc::clone(registry),
            gate: Arc::new(Gate::new(Some(4))),
            bus: Bus::new(64),
        }
    }

    fn registered(registry: &Registry, mode: WorkerMode) -> Worker {
        let w = Worker::new(1, Arc::from("w"), mode, true, None, Bus::new(8));
        registry.insert_if_vacant(w.clone()).unwrap();
        w
    }

    #[tokio::test]
    async fn test_run_once_invokes_hooks_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
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
        let registry = Arc::new(Registry::new());
        let w = registered(&registry, WorkerMode::RunOnce);
        let hooks = Hooks {
            post_start: Some(step("post_start")),
            pre: Some(step("pre")),
            post: Some(step("post")),
            alternate: None,
        };

        routine(&w, step("payload"), None, hooks, &registry).run().await;

        assert_eq!(
            *order.lock().unwrap(),
            vec!["post_start", "pre", "payload", "post"]
        );
        assert!(w.is_triggered());
        assert_eq!(w.state(), WorkerState::Stopped);
        assert!(registry.get("w").is_none());
    }

    #[tokio::test]
    async fn test_error_is_recorded_and_cleanup_runs() {
        let registry = Arc::new(Registry::new());
        let w = registered(&registry, WorkerMode::RunOnce);
        let failing: TaskRef =
            TaskFn::arc("fail", |_ctx: CancellationToken| async { Err(TaskError::fail("nope")) });

        routine(&w, failing, None, Hooks::default(), &registry).run().await;

        assert_eq!(w.join().await, Err(TaskError::fail("nope")));
        assert!(!w.is_triggered());
        assert!(registry.get("w").is_none());
    }

    #[tokio::test]
    async fn test_post_start_failure_skips_payload() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(Registry::new());
        let w = registered(&registry, WorkerMode::RunOnce);
        let hooks = Hooks {
            post_start: Some(TaskFn::arc("ps", |_ctx: CancellationToken| async {
                Err(TaskError::fail("no start"))
            })),
            ..Hooks::default()
        };

        routine(&w, counting(&hits), None, hooks, &registry).run().await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(w.last_error().is_some());
    }

    #[tokio::test]
    async fn test_one_shot_runs_alternate_after_trigger() {
        let hits = Arc::new(AtomicUsize::new(0));
        let alt_hits = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(Registry::new());
        let w = registered(&registry, WorkerMode::OneShot);
        let hooks = Hooks {
            alternate: Some(counting(&alt_hits)),
            ..Hooks::default()
        };

        let task = tokio::spawn(
            routine(&w, counting(&hits), Some(ListenFn::always()), hooks, &registry).run(),
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        w.stop();
        task.await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(alt_hits.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_stopped_before_start_never_admits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(Registry::new());
        let w = registered(&registry, WorkerMode::RunOnce);
        w.stop();

        let r = routine(&w, counting(&hits), None, Hooks::default(), &registry);
        let gate = Arc::clone(&r.gate);
        r.run().await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(gate.active(), 0);
        assert_eq!(w.state(), WorkerState::Stopped);
    }
}
