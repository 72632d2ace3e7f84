//! # Concurrency gate - soft cap on admitted workers.
//!
//! A worker must take a slot before its `post_start` hook runs and gives it back when
//! its routine exits. When the cap is reached, the worker polls every
//! `max_concurrency_wait` until a slot frees up or the worker is stopped.
//!
//! ```text
//! acquire ─► try_acquire ─┬─► true  → admitted
//!              ▲          └─► false → publish AdmissionDelayed (first miss only)
//!              └──── sleep(wait) ◄──┘   (select! with stop → not admitted)
//! ```
//!
//! The counter is a compare-and-swap loop, so it never exceeds the cap and never
//! drifts; the "soft" part is that waiting has no deadline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};

pub(crate) struct Gate {
    limit: Option<usize>,
    active: AtomicUsize,
}

impl Gate {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            active: AtomicUsize::new(0),
        }
    }

    /// Number of admitted workers.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> bool {
        let Some(limit) = self.limit else {
            self.active.fetch_add(1, Ordering::AcqRel);
            return true;
        };
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .is_ok()
    }

    /// Waits for a slot. Returns `false` if `stop` fired first.
    pub(crate) async fn acquire(
        &self,
        label: &str,
        wait: Duration,
        stop: &CancellationToken,
        bus: &Bus,
    ) -> bool {
        let mut delayed = false;
        loop {
            if stop.is_cancelled() {
                return false;
            }
            if self.try_acquire() {
                return true;
            }
            if !delayed {
                delayed = true;
                bus.publish(
                    Event::new(EventKind::AdmissionDelayed)
                        .with_worker(label)
                        .with_active(self.active()),
                );
            }
            select! {
                _ = tokio::time::sleep(wait) => {}
                _ = stop.cancelled() => return false,
            }
        }
    }

    pub(crate) fn release(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}
