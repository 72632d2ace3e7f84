//! # Worker specification.
//!
//! [`WorkerSpec`] bundles everything needed to spawn a worker: the payload, the
//! optional listen condition, the one-shot flag and [`WorkerOptions`].
//!
//! The mode is derived, not stored:
//!
//! | listen condition | one-shot | mode                   |
//! |------------------|----------|------------------------|
//! | none             | -        | [`WorkerMode::RunOnce`] |
//! | some             | no       | [`WorkerMode::Listen`]  |
//! | some             | yes      | [`WorkerMode::OneShot`] |
//!
//! The payload is optional so that a spec can be assembled piecemeal; spawning a spec
//! without payload is a silent no-op (`Ok(None)`).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{ListenFn, TaskFn, TaskRef, WorkerMode, WorkerOptions, WorkerSpec};
//!
//! let save: TaskRef = TaskFn::arc("save", |_ctx: CancellationToken| async { Ok(()) });
//!
//! let spec = WorkerSpec::one_shot(save, ListenFn::always())
//!     .with_options(WorkerOptions::labeled("autosave").with_poll_interval(Duration::from_millis(50)));
//!
//! assert_eq!(spec.mode(), WorkerMode::OneShot);
//! assert_eq!(spec.options().label.as_deref(), Some("autosave"));
//! ```

use crate::tasks::{ListenFn, TaskRef};
use crate::worker::options::WorkerOptions;
use crate::worker::state::WorkerMode;

/// Specification for spawning a worker.
#[derive(Clone, Debug, Default)]
pub struct WorkerSpec {
    payload: Option<PayloadSlot>,
    listen: Option<ListenFn>,
    one_shot: bool,
    options: WorkerOptions,
}

#[derive(Clone)]
struct PayloadSlot(TaskRef);

impl std::fmt::Debug for PayloadSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Payload({})", self.0.name())
    }
}

impl WorkerSpec {
    /// Run-once worker.
    pub fn run(payload: TaskRef) -> Self {
        Self::default().with_payload(payload)
    }

    /// Listen worker: invokes `payload` on every tick where `listen` is true.
    pub fn listen(payload: TaskRef, listen: ListenFn) -> Self {
        Self::run(payload).with_listen(listen)
    }

    /// One-shot worker: like [`WorkerSpec::listen`], but fires at most once per arming.
    pub fn one_shot(payload: TaskRef, listen: ListenFn) -> Self {
        Self::listen(payload, listen).with_one_shot(true)
    }

    /// Spec without payload; see the module docs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets the payload.
    pub fn with_payload(mut self, payload: TaskRef) -> Self {
        self.payload = Some(PayloadSlot(payload));
        self
    }

    /// Sets the listen condition; a run-once spec becomes a listen spec.
    pub fn with_listen(mut self, listen: ListenFn) -> Self {
        self.listen = Some(listen);
        self
    }

    /// Turns one-shot behavior on or off.
    ///
    /// A one-shot spec without listen condition listens on [`ListenFn::always`].
    pub fn with_one_shot(mut self, one_shot: bool) -> Self {
        self.one_shot = one_shot;
        if one_shot && self.listen.is_none() {
            self.listen = Some(ListenFn::always());
        }
        self
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: WorkerOptions) -> Self {
        self.options = options;
        self
    }

    /// Derived execution mode.
    pub fn mode(&self) -> WorkerMode {
        match (&self.listen, self.one_shot) {
            (None, _) => WorkerMode::RunOnce,
            (Some(_), false) => WorkerMode::Listen,
            (Some(_), true) => WorkerMode::OneShot,
        }
    }

    /// Returns the payload, if set.
    pub fn payload(&self) -> Option<&TaskRef> {
        self.payload.as_ref().map(|p| &p.0)
    }

    /// Returns the listen condition, if set.
    pub fn listen_fn(&self) -> Option<&ListenFn> {
        self.listen.as_ref()
    }

    /// Returns the options.
    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub(crate) fn into_parts(self) -> (Option<TaskRef>, Option<ListenFn>, WorkerMode, WorkerOptions) {
        let mode = self.mode();
        (self.payload.map(|p| p.0), self.listen, mode, self.options)
    }
}
