//! # Per-worker signalling primitives.
//!
//! [`LifecycleFlags`] holds the three flags a worker routine consults on every tick.
//! They are mutated from caller handles while the routine reads them, so none of them
//! is a plain field:
//!
//! | flag        | primitive                  | semantics                          |
//! |-------------|----------------------------|------------------------------------|
//! | stop        | `CancellationToken`        | monotonic, level-triggered         |
//! | paused      | `watch::Sender<bool>`      | toggleable; waiters park, no spin  |
//! | triggered   | `AtomicBool`               | set after a payload run, `reset()` |

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub(crate) struct LifecycleFlags {
    stop: CancellationToken,
    stop_claimed: AtomicBool,
    paused: watch::Sender<bool>,
    triggered: AtomicBool,
}

impl LifecycleFlags {
    pub(crate) fn new() -> Self {
        let (paused, _rx) = watch::channel(false);
        Self {
            stop: CancellationToken::new(),
            stop_claimed: AtomicBool::new(false),
            paused,
            triggered: AtomicBool::new(false),
        }
    }

    /// Sets the stop flag. Returns `true` only for the first caller.
    pub(crate) fn request_stop(&self) -> bool {
        let first = !self.stop_claimed.swap(true, Ordering::AcqRel);
        self.stop.cancel();
        first
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Token handed to hooks; cancelled on stop.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.stop
    }

    /// Returns `true` if the value changed.
    pub(crate) fn set_paused(&self, state: bool) -> bool {
        self.paused.send_if_modified(|p| {
            if *p == state {
                false
            } else {
                *p = state;
                true
            }
        })
    }

    pub(crate) fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Parks until the worker is resumed.
    ///
    /// Returns `false` if stop was requested first.
    pub(crate) async fn wait_resumed(&self) -> bool {
        if self.is_stop_requested() {
            return false;
        }
        let mut rx = self.paused.subscribe();
        tokio::select! {
            res = rx.wait_for(|p| !*p) => res.is_ok() && !self.is_stop_requested(),
            _ = self.stop.cancelled() => false,
        }
    }

    pub(crate) fn set_triggered(&self, state: bool) {
        self.triggered.store(state, Ordering::Release);
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}
