//! # Per-worker options and label admission.
//!
//! [`WorkerOptions`] is the `opts` bundle accepted by
//! [`Supervisor::run`](crate::Supervisor::run), [`listen`](crate::Supervisor::listen) and
//! [`one_shot`](crate::Supervisor::one_shot): label, timing, admission policy and the
//! optional hooks.
//!
//! ## Hook order
//! ```text
//! caller:  pre_start ──► (register) ──► spawn routine
//! routine: [wait for slot] ──► post_start ──► { pre ──► payload ──► post }*
//!                                              alternate (one-shot, already triggered)
//! stop():  stop hook (caller side, first call only)
//! ```
//!
//! ## Sentinel values
//! - `poll_interval = None` → supervisor default ([`SupervisorConfig::poll_interval`](crate::SupervisorConfig))
//! - `max_concurrency_wait = None` → supervisor default
//! - `timeout = None` → payload invocations may run forever

use std::fmt;
use std::time::Duration;

use crate::tasks::{StopFn, TaskRef};

/// Policy controlling how a new worker is handled when its label is taken by a live worker.
///
/// Each label is a slot: at most one live worker may hold it at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Admission {
    /// Stop and join the live worker, then start the new one (default).
    #[default]
    Replace,
    /// Refuse the new worker with [`RuntimeError::LabelInUse`](crate::RuntimeError::LabelInUse).
    Reject,
    /// Keep the live worker and return its handle instead; the new request is dropped.
    KeepExisting,
}

/// Options for a single worker.
#[derive(Clone)]
pub struct WorkerOptions {
    /// Registry label. `None` → an auto-generated `worker-N` label.
    pub label: Option<String>,
    /// Daemon workers are not awaited by [`Supervisor::wait_idle`](crate::Supervisor::wait_idle).
    pub daemon: bool,
    /// Sleep between two listen ticks.
    pub poll_interval: Option<Duration>,
    /// Sleep between two checks of the concurrency cap.
    pub max_concurrency_wait: Option<Duration>,
    /// Deadline for one payload invocation.
    pub timeout: Option<Duration>,
    /// What to do when the label is taken.
    pub admission: Admission,

    /// Runs on the caller before registration; an error aborts the spawn.
    pub pre_start: Option<TaskRef>,
    /// Runs first on the worker routine, once admitted.
    pub post_start: Option<TaskRef>,
    /// Runs before every payload invocation.
    pub pre: Option<TaskRef>,
    /// Runs after every successful payload invocation unless stop was requested meanwhile.
    pub post: Option<TaskRef>,
    /// One-shot only: runs instead of the payload once the worker is triggered.
    pub alternate: Option<TaskRef>,
    /// Runs on the caller the first time the worker is asked to stop.
    pub stop: Option<StopFn>,
}

impl Default for WorkerOptions {
    /// Anonymous daemon worker, supervisor timing defaults, no timeout,
    /// [`Admission::Replace`], no hooks.
    fn default() -> Self {
        Self {
            label: None,
            daemon: true,
            poll_interval: None,
            max_concurrency_wait: None,
            timeout: None,
            admission: Admission::default(),
            pre_start: None,
            post_start: None,
            pre: None,
            post: None,
            alternate: None,
            stop: None,
        }
    }
}

impl fmt::Debug for WorkerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hook = |h: &Option<TaskRef>| h.as_ref().map(|t| t.name().to_owned());
        f.debug_struct("WorkerOptions")
            .field("label", &self.label)
            .field("daemon", &self.daemon)
            .field("poll_interval", &self.poll_interval)
            .field("max_concurrency_wait", &self.max_concurrency_wait)
            .field("timeout", &self.timeout)
            .field("admission", &self.admission)
            .field("pre_start", &hook(&self.pre_start))
            .field("post_start", &hook(&self.post_start))
            .field("pre", &hook(&self.pre))
            .field("post", &hook(&self.post))
            .field("alternate", &hook(&self.alternate))
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

impl WorkerOptions {
    /// Options with the given label and everything else default.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self::default().with_label(label)
    }

    /// Returns options with updated label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns options with updated daemon flag.
    pub fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Returns options with updated listen interval.
    pub fn with_poll_interval(mut self, every: Duration) -> Self {
        self.poll_interval = Some(every);
        self
    }

    /// Returns options with updated concurrency-cap polling interval.
    pub fn with_max_concurrency_wait(mut self, every: Duration) -> Self {
        self.max_concurrency_wait = Some(every);
        self
    }

    /// Returns options with a payload deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns options with updated admission policy.
    pub fn with_admission(mut self, admission: Admission) -> Self {
        self.admission = admission;
        self
    }

    /// Sets the `pre_start` hook.
    pub fn with_pre_start(mut self, hook: TaskRef) -> Self {
        self.pre_start = Some(hook);
        self
    }

    /// Sets the `post_start` hook.
    pub fn with_post_start(mut self, hook: TaskRef) -> Self {
        self.post_start = Some(hook);
        self
    }

    /// Sets the `pre` hook.
    pub fn with_pre(mut self, hook: TaskRef) -> Self {
        self.pre = Some(hook);
        self
    }

    /// Sets the `post` hook.
    pub fn with_post(mut self, hook: TaskRef) -> Self {
        self.post = Some(hook);
        self
    }

    /// Sets the one-shot `alternate` hook.
    pub fn with_alternate(mut self, hook: TaskRef) -> Self {
        self.alternate = Some(hook);
        self
    }

    /// Sets the `stop` hook.
    pub fn with_stop(mut self, hook: StopFn) -> Self {
        self.stop = Some(hook);
        self
    }
}
