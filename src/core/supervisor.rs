//! # Supervisor: owns the registry, spawns workers, coordinates shutdown.
//!
//! The [`Supervisor`] keeps one [`Worker`] per label, spawns a routine for every
//! accepted spec, enforces the soft concurrency cap through a shared gate, and
//! stops everything within [`SupervisorConfig::grace`] on request or on OS signal.
//!
//! ## Spawn
//! ```text
//! spawn(spec)
//!   ├─► no payload                        → Ok(None)
//!   ├─► label taken, Reject               → Err(LabelInUse), pre_start not run
//!   ├─► label taken, KeepExisting         → Ok(Some(live)), pre_start not run
//!   ├─► pre_start (on the caller)         → Err(PreStart), nothing registered
//!   ├─► registry.insert_if_vacant ◄──────────────────────────────┐
//!   │     └─► label taken:                                        │
//!   │           Replace      → stop + join live worker, publish   │
//!   │                          WorkerReplaced, retry ─────────────┘
//!   │           Reject       → Err(LabelInUse)
//!   │           KeepExisting → Ok(Some(live))
//!   ├─► publish WorkerRegistered
//!   ├─► tokio::spawn(routine.run())
//!   └─► wait until the routine is Running (or already gone) → Ok(Some(worker))
//! ```
//!
//! The registry lock is never held across an await point: the live worker is stopped
//! and joined through a cloned handle, and its routine removes only its own entry.
//! Waiting for `Running` makes the concurrency cap visible to the caller: when the cap
//! is reached, `spawn` does not return until the new worker gets a slot.
//!
//! ## Shutdown
//! ```text
//! run_until_shutdown()
//!   ├─► OS signal → publish ShutdownRequested ─┐
//!   └─► wait_idle() (non-daemons done) ────────┴─► stop_all()
//!                                                    ├─► stop() every worker
//!                                                    └─► join all within grace
//!                                                          ├─ Ok  → AllStoppedWithin
//!                                                          └─ Err → GraceExceeded{stuck}
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{Supervisor, SupervisorConfig, TaskFn, TaskRef, WorkerOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!
//!     let total = Arc::new(AtomicUsize::new(0));
//!     let t = Arc::clone(&total);
//!     let job: TaskRef = TaskFn::arc("job", move |_ctx: CancellationToken| {
//!         let t = Arc::clone(&t);
//!         async move {
//!             t.fetch_add(1, Ordering::SeqCst);
//!             Ok(())
//!         }
//!     });
//!
//!     let w = sup.run(job, WorkerOptions::labeled("job1")).await?;
//!     w.join().await?;
//!     assert_eq!(total.load(Ordering::SeqCst), 1);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::gate::Gate;
use crate::core::registry::Registry;
use crate::core::routine::{Hooks, Timing, WorkerRoutine};
use crate::core::runner::invoke;
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{ListenFn, TaskRef};
use crate::worker::{Admission, Worker, WorkerMode, WorkerOptions, WorkerSpec};

/// Owns the worker registry and coordinates worker lifecycles.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    registry: Arc<Registry>,
    gate: Arc<Gate>,
    next_id: AtomicU64,
    subscribers: usize,
    listener: CancellationToken,
}

impl Supervisor {
    /// Returns a builder for the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subscribers: usize,
        listener: CancellationToken,
    ) -> Self {
        let gate = Arc::new(Gate::new(cfg.concurrency_limit()));
        Self {
            cfg,
            bus,
            registry: Arc::new(Registry::new()),
            gate,
            next_id: AtomicU64::new(0),
            subscribers,
            listener,
        }
    }

    /// Starts a run-once worker: `pre` → `payload` → `post`, then exit.
    pub async fn run(&self, payload: TaskRef, opts: WorkerOptions) -> Result<Worker, RuntimeError> {
        self.spawn_worker(payload, None, WorkerMode::RunOnce, opts)
            .await
    }

    /// Starts a listen worker: invokes `payload` on every poll tick where `listen` is true.
    pub async fn listen(
        &self,
        payload: TaskRef,
        listen: ListenFn,
        opts: WorkerOptions,
    ) -> Result<Worker, RuntimeError> {
        self.spawn_worker(payload, Some(listen), WorkerMode::Listen, opts)
            .await
    }

    /// Starts a one-shot worker: like [`listen`](Self::listen), but the payload runs at
    /// most once until [`Worker::reset`]; later true ticks run `alternate` instead.
    pub async fn one_shot(
        &self,
        payload: TaskRef,
        listen: ListenFn,
        opts: WorkerOptions,
    ) -> Result<Worker, RuntimeError> {
        self.spawn_worker(payload, Some(listen), WorkerMode::OneShot, opts)
            .await
    }

    /// Spawns a worker from a spec. A spec without payload is ignored (`Ok(None)`).
    pub async fn spawn(&self, spec: WorkerSpec) -> Result<Option<Worker>, RuntimeError> {
        let (payload, listen, mode, opts) = spec.into_parts();
        match payload {
            Some(payload) => self.spawn_worker(payload, listen, mode, opts).await.map(Some),
            None => Ok(None),
        }
    }

    async fn spawn_worker(
        &self,
        payload: TaskRef,
        listen: Option<ListenFn>,
        mode: WorkerMode,
        opts: WorkerOptions,
    ) -> Result<Worker, RuntimeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let label: Arc<str> = match &opts.label {
            Some(label) => Arc::from(label.as_str()),
            None => Arc::from(format!("worker-{id}")),
        };

        if let Some(live) = self.registry.get(&label) {
            match opts.admission {
                Admission::Replace => {}
                Admission::Reject => {
                    return Err(RuntimeError::LabelInUse {
                        label: label.to_string(),
                    });
                }
                Admission::KeepExisting => return Ok(live),
            }
        }

        if let Some(hook) = &opts.pre_start {
            invoke(hook.as_ref(), &CancellationToken::new(), None, &label, &self.bus)
                .await
                .map_err(|source| RuntimeError::PreStart {
                    label: label.to_string(),
                    source,
                })?;
        }

        let worker = Worker::new(
            id,
            Arc::clone(&label),
            mode,
            opts.daemon,
            opts.stop.clone(),
            self.bus.clone(),
        );

        while let Err(live) = self.registry.insert_if_vacant(worker.clone()) {
            match opts.admission {
                Admission::Replace => {
                    live.stop();
                    let _ = live.join().await;
                    self.bus.publish(
                        Event::new(EventKind::WorkerReplaced).with_worker(Arc::clone(&label)),
                    );
                }
                Admission::Reject => {
                    return Err(RuntimeError::LabelInUse {
                        label: label.to_string(),
                    });
                }
                Admission::KeepExisting => return Ok(live),
            }
        }
        self.bus
            .publish(Event::new(EventKind::WorkerRegistered).with_worker(Arc::clone(&label)));

        let routine = WorkerRoutine {
            worker: worker.clone(),
            payload,
            listen,
            timing: Timing {
                poll_interval: opts.poll_interval.unwrap_or(self.cfg.poll_interval),
                max_concurrency_wait: opts
                    .max_concurrency_wait
                    .unwrap_or(self.cfg.max_concurrency_wait),
                timeout: opts.timeout,
            },
            hooks: Hooks {
                post_start: opts.post_start,
                pre: opts.pre,
                post: opts.post,
                alternate: opts.alternate,
            },
            registry: Arc::clone(&self.registry),
            gate: Arc::clone(&self.gate),
            bus: self.bus.clone(),
        };
        tokio::spawn(routine.run());

        worker.wait_started().await;
        Ok(worker)
    }

    /// Returns the live worker registered under `label`.
    pub fn get(&self, label: &str) -> Option<Worker> {
        self.registry.get(label)
    }

    /// Sorted labels of all registered workers.
    pub fn list(&self) -> Vec<String> {
        self.registry.labels()
    }

    /// Handles of all registered workers, sorted by label.
    pub fn workers(&self) -> Vec<Worker> {
        self.registry.snapshot()
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if no worker is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of workers holding a concurrency slot.
    pub fn active(&self) -> usize {
        self.gate.active()
    }

    /// Pauses or resumes every registered worker.
    pub fn pause_all(&self, state: bool) {
        for w in self.registry.snapshot() {
            w.pause(state);
        }
    }

    /// Stops every registered worker and waits up to [`SupervisorConfig::grace`] for them.
    ///
    /// Publishes `AllStoppedWithin` on success, or `GraceExceeded` and returns
    /// [`RuntimeError::GraceExceeded`] with the labels still alive.
    pub async fn stop_all(&self) -> Result<(), RuntimeError> {
        let workers = self.registry.snapshot();
        for w in &workers {
            w.stop();
        }

        let grace = self.cfg.grace;
        let joined = tokio::time::timeout(grace, join_all(workers.iter().map(|w| w.join()))).await;
        match joined {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let stuck: Vec<String> = workers
                    .iter()
                    .filter(|w| w.is_alive())
                    .map(|w| w.label().to_owned())
                    .collect();
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Waits until no non-daemon worker is registered.
    ///
    /// Daemon workers are not waited for; with only daemons registered this returns
    /// immediately.
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<Worker> = self
                .registry
                .snapshot()
                .into_iter()
                .filter(|w| !w.is_daemon())
                .collect();
            if pending.is_empty() {
                return;
            }
            join_all(pending.iter().map(|w| w.join())).await;
        }
    }

    /// Runs until an OS termination signal arrives or every non-daemon worker is done,
    /// then stops all remaining workers via [`stop_all`](Self::stop_all).
    pub async fn run_until_shutdown(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            _ = shutdown::wait_for_shutdown_signal() => {
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
            }
            _ = self.wait_idle() => {}
        }
        self.stop_all().await
    }

    /// The event bus; subscribe to observe lifecycle events directly.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The configuration this supervisor was built with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Number of subscribers attached at build time.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.listener.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::error::TaskError;
    use crate::tasks::TaskFn;

    fn cfg() -> SupervisorConfig {
        SupervisorConfig {
            poll_interval: Duration::from_millis(5),
            max_concurrency_wait: Duration::from_millis(2),
            grace: Duration::from_secs(2),
            ..SupervisorConfig::default()
        }
    }

    fn noop() -> TaskRef {
        TaskFn::arc("noop", |_ctx: CancellationToken| async { Ok(()) })
    }

    #[tokio::test]
    async fn test_auto_labels_are_unique() {
        let sup = Supervisor::builder(cfg()).build();
        let hold = ListenFn::new(|| false);
        let a = sup.listen(noop(), hold.clone(), WorkerOptions::default()).await.unwrap();
        let b = sup.listen(noop(), hold, WorkerOptions::default()).await.unwrap();

        assert_ne!(a.label(), b.label());
        assert!(a.label().starts_with("worker-"));
        assert_eq!(sup.len(), 2);
        sup.stop_all().await.unwrap();
        assert!(sup.is_empty());
    }

    #[tokio::test]
    async fn test_spec_without_payload_is_ignored() {
        let sup = Supervisor::builder(cfg()).build();
        let out = sup.spawn(WorkerSpec::empty()).await.unwrap();
        assert!(out.is_none());
        assert!(sup.is_empty());
    }

    #[tokio::test]
    async fn test_pre_start_failure_registers_nothing() {
        let sup = Supervisor::builder(cfg()).build();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let payload: TaskRef = TaskFn::arc("p", move |_ctx: CancellationToken| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let opts = WorkerOptions::labeled("x").with_pre_start(TaskFn::arc(
            "pre_start",
            |_ctx: CancellationToken| async { Err(TaskError::fail("not ready")) },
        ));

        let err = sup.run(payload, opts).await.unwrap_err();
        assert!(matches!(err, RuntimeError::PreStart { ref label, .. } if label == "x"));
        assert!(sup.get("x").is_none());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_all_reports_stuck_workers() {
        let sup = Supervisor::builder(SupervisorConfig {
            grace: Duration::from_millis(30),
            ..cfg()
        })
        .build();
        let stubborn: TaskRef = TaskFn::arc("stubborn", |_ctx: CancellationToken| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        sup.run(stubborn, WorkerOptions::labeled("stuck")).await.unwrap();

        match sup.stop_all().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["stuck"]),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
