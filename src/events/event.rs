//! # Runtime events emitted by the supervisor and worker routines.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: a worker was registered under a label or replaced another one
//! - **Lifecycle events**: routine flow (admission, starting, invocations, pause, stop, failure)
//! - **Shutdown events**: `stop_all` and OS signal handling
//! - **Subscriber events**: overflow or panic inside an event subscriber
//!
//! The [`Event`] struct carries additional metadata such as the worker label,
//! invocation count, live worker total, and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("autosave")
//!     .with_reason("disk full")
//!     .with_invocation(3);
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("autosave"));
//! assert_eq!(ev.reason.as_deref(), Some("disk full"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// `stop_all` joined every worker within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets:
    /// - `reason`: comma-separated labels of the stuck workers
    GraceExceeded,

    // === Registry events ===
    /// Worker inserted into the registry.
    ///
    /// Sets:
    /// - `worker`: label
    WorkerRegistered,

    /// A live worker was stopped and joined to make room for a new one under the same label.
    ///
    /// Sets:
    /// - `worker`: label
    WorkerReplaced,

    // === Worker lifecycle events ===
    /// Worker is waiting for the concurrency cap to free up (published once per wait).
    ///
    /// Sets:
    /// - `worker`: label
    /// - `active`: admitted workers at the time of the check
    AdmissionDelayed,

    /// Worker routine was admitted and starts running ("Running Thread").
    ///
    /// Sets:
    /// - `worker`: label
    /// - `active`: admitted workers including this one
    WorkerStarting,

    /// Payload finished one invocation successfully.
    ///
    /// Sets:
    /// - `worker`: label
    /// - `invocation`: 1-based invocation count
    PayloadInvoked,

    /// One-shot worker ran its alternate hook because it was already triggered.
    ///
    /// Sets:
    /// - `worker`: label
    AlternateInvoked,

    /// Worker was paused.
    WorkerPaused,

    /// Worker was resumed.
    WorkerResumed,

    /// First `stop()` call on a worker.
    StopRequested,

    /// Payload invocation exceeded the worker's timeout.
    ///
    /// Sets:
    /// - `worker`: label
    /// - `timeout_ms`: configured timeout
    TimeoutHit,

    /// A hook or the payload returned an error (or panicked); the routine ends.
    ///
    /// Sets:
    /// - `worker`: label
    /// - `reason`: error message
    /// - `invocation`: invocations completed before the failure
    WorkerFailed,

    /// Routine exited and the worker left the registry ("Closing Thread").
    ///
    /// Sets:
    /// - `worker`: label
    /// - `invocation`: total payload invocations
    /// - `active`: admitted workers remaining
    WorkerStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Label of the worker, if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Payload invocation count.
    pub invocation: Option<u64>,
    /// Number of admitted workers.
    pub active: Option<usize>,
    /// Payload timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            invocation: None,
            active: None,
            timeout_ms: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a worker label.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches an invocation count.
    #[inline]
    pub fn with_invocation(mut self, n: u64) -> Self {
        self.invocation = Some(n);
        self
    }

    /// Attaches the number of admitted workers.
    #[inline]
    pub fn with_active(mut self, n: usize) -> Self {
        self.active = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
