//! Worker mode and lifecycle state.
//!
//! ```text
//! Created ──► Starting ──► Running ⇄ Paused ──► Stopping ──► Stopped
//! ```
//!
//! `Paused` is never stored: it is reported by [`Worker::state`](crate::Worker::state)
//! while the routine is `Running` and the pause flag is set. "Triggered" is an
//! orthogonal flag, not a state.

/// Execution mode of a worker, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerMode {
    /// Invoke the payload once and exit.
    RunOnce,
    /// Poll the listen condition and invoke the payload every time it is true.
    Listen,
    /// Like `Listen`, but the payload fires at most once per arming;
    /// later true ticks run the alternate hook until [`Worker::reset`](crate::Worker::reset).
    OneShot,
}

impl WorkerMode {
    /// Whether the worker polls a listen condition.
    pub fn is_listening(self) -> bool {
        !matches!(self, WorkerMode::RunOnce)
    }
}

/// Lifecycle state of a worker.
///
/// Variants are ordered: the stored state only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkerState {
    /// Handle exists, routine not spawned yet.
    Created,
    /// Routine spawned; waiting for a concurrency slot or running `post_start`.
    Starting,
    /// Payload / listen loop in progress.
    Running,
    /// Running, but blocked at the pause check.
    Paused,
    /// Stop requested or routine returning.
    Stopping,
    /// Routine exited and the worker left the registry.
    Stopped,
}

impl WorkerState {
    /// True once the routine has exited.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Stopped)
    }

    /// True once the routine got past its start phase (or gave up starting).
    pub(crate) fn has_started(self) -> bool {
        self >= WorkerState::Running
    }
}
