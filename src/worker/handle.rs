//! # Worker handle.
//!
//! A [`Worker`] is a cheap, cloneable handle to one supervised unit of work. The
//! supervisor keeps one clone in its registry; callers get others from
//! [`Supervisor::run`](crate::Supervisor::run) or [`Supervisor::get`](crate::Supervisor::get).
//!
//! All control methods are safe to call from any thread, concurrently with the
//! worker's own routine:
//!
//! | method        | effect                                                     |
//! |---------------|------------------------------------------------------------|
//! | `stop()`      | sets the stop flag, runs the stop hook once; idempotent    |
//! | `pause(bool)` | parks / releases the listen loop at its pause check        |
//! | `reset()`     | clears `triggered`, re-arming a one-shot worker            |
//! | `trigger()`   | sets `triggered`, disarming a one-shot worker              |
//! | `join()`      | waits for the routine to exit (does **not** stop it)       |

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::StopFn;
use crate::worker::flags::LifecycleFlags;
use crate::worker::state::{WorkerMode, WorkerState};

struct Shared {
    id: u64,
    label: Arc<str>,
    mode: WorkerMode,
    daemon: bool,
    flags: LifecycleFlags,
    state: watch::Sender<WorkerState>,
    invocations: AtomicU64,
    last_error: Mutex<Option<TaskError>>,
    stop_hook: Option<StopFn>,
    bus: Bus,
}

/// Handle to a supervised worker.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<Shared>,
}

impl Worker {
    pub(crate) fn new(
        id: u64,
        label: Arc<str>,
        mode: WorkerMode,
        daemon: bool,
        stop_hook: Option<StopFn>,
        bus: Bus,
    ) -> Self {
        let (state, _rx) = watch::channel(WorkerState::Created);
        Self {
            inner: Arc::new(Shared {
                id,
                label,
                mode,
                daemon,
                flags: LifecycleFlags::new(),
                state,
                invocations: AtomicU64::new(0),
                last_error: Mutex::new(None),
                stop_hook,
                bus,
            }),
        }
    }

    /// Registry label.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Supervisor-unique id; differs between a worker and its replacement.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Execution mode.
    pub fn mode(&self) -> WorkerMode {
        self.inner.mode
    }

    /// Whether the worker is a daemon.
    pub fn is_daemon(&self) -> bool {
        self.inner.daemon
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        let state = *self.inner.state.borrow();
        if state == WorkerState::Running && self.inner.flags.is_paused() {
            WorkerState::Paused
        } else {
            state
        }
    }

    /// True until the routine has exited.
    pub fn is_alive(&self) -> bool {
        !self.state().is_terminal()
    }

    /// Requests a cooperative stop.
    ///
    /// The current payload invocation (if any) is not interrupted; the routine exits at
    /// its next check. The stop hook runs on the calling thread, on the first call only.
    pub fn stop(&self) {
        if !self.inner.flags.request_stop() {
            return;
        }
        self.inner
            .bus
            .publish(Event::new(EventKind::StopRequested).with_worker(self.inner.label.clone()));
        if let Some(hook) = &self.inner.stop_hook {
            hook.call();
        }
        self.advance(WorkerState::Stopping);
    }

    /// Pauses (`true`) or resumes (`false`) the listen loop.
    pub fn pause(&self, state: bool) {
        if self.inner.flags.set_paused(state) {
            let kind = if state {
                EventKind::WorkerPaused
            } else {
                EventKind::WorkerResumed
            };
            self.inner
                .bus
                .publish(Event::new(kind).with_worker(self.inner.label.clone()));
        }
    }

    /// Re-arms a one-shot worker.
    pub fn reset(&self) {
        self.inner.flags.set_triggered(false);
    }

    /// Marks the worker as triggered, as if the payload had just run.
    pub fn trigger(&self) {
        self.inner.flags.set_triggered(true);
    }

    /// Whether the payload has run since construction or the last [`reset`](Self::reset).
    pub fn is_triggered(&self) -> bool {
        self.inner.flags.is_triggered()
    }

    /// Whether the worker is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.flags.is_paused()
    }

    /// Whether [`stop`](Self::stop) was called.
    pub fn is_stop_requested(&self) -> bool {
        self.inner.flags.is_stop_requested()
    }

    /// Number of successful payload invocations.
    pub fn invocations(&self) -> u64 {
        self.inner.invocations.load(Ordering::Acquire)
    }

    /// Error that ended the routine, if any.
    pub fn last_error(&self) -> Option<TaskError> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits until the routine has exited and returns the error that ended it, if any.
    pub async fn join(&self) -> Result<(), TaskError> {
        self.wait_state(|s| s.is_terminal()).await;
        match self.last_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Like [`join`](Self::join) with a deadline. Returns `true` if the routine exited in time.
    pub async fn join_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_state(|s| s.is_terminal()))
            .await
            .is_ok()
    }

    /// Stops the worker and waits for it.
    pub async fn shutdown(&self) -> Result<(), TaskError> {
        self.stop();
        self.join().await
    }

    // ---- routine side ----

    pub(crate) fn token(&self) -> &CancellationToken {
        self.inner.flags.token()
    }

    pub(crate) fn flags(&self) -> &LifecycleFlags {
        &self.inner.flags
    }

    pub(crate) fn label_arc(&self) -> Arc<str> {
        self.inner.label.clone()
    }

    /// Moves the stored state forward; never backwards.
    pub(crate) fn advance(&self, to: WorkerState) {
        self.inner.state.send_if_modified(|s| {
            if to > *s {
                *s = to;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn record_invocation(&self) -> u64 {
        self.inner.invocations.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn record_error(&self, err: TaskError) {
        *self
            .inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    pub(crate) async fn wait_started(&self) {
        self.wait_state(|s| s.has_started()).await;
    }

    async fn wait_state(&self, pred: impl FnMut(&WorkerState) -> bool) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(pred).await;
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("mode", &self.inner.mode)
            .field("state", &self.state())
            .field("triggered", &self.is_triggered())
            .field("invocations", &self.invocations())
            .finish()
    }
}
