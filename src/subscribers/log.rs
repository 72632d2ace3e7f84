//! # LogWriter - forwards lifecycle events to `tracing`
//!
//! Maps every [`EventKind`] to a log level and a message, with the event metadata as
//! structured fields. Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`)
//! to see the output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  workvisor: Running Thread worker="autosave" active=3
//! DEBUG workvisor: payload invoked worker="autosave" invocation=1
//! WARN  workvisor: worker failed worker="autosave" reason="execution failed: disk full"
//! INFO  workvisor: Closing Thread worker="autosave" invocation=1 active=2
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "workvisor";

/// Event writer subscriber.
#[derive(Default, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkerStarting => {
                info!(target: TARGET, worker, active = e.active, "Running Thread");
            }
            EventKind::WorkerStopped => {
                info!(
                    target: TARGET,
                    worker,
                    invocation = e.invocation,
                    active = e.active,
                    "Closing Thread"
                );
            }
            EventKind::WorkerRegistered => {
                debug!(target: TARGET, worker, "worker registered");
            }
            EventKind::WorkerReplaced => {
                info!(target: TARGET, worker, "worker replaced");
            }
            EventKind::AdmissionDelayed => {
                warn!(target: TARGET, worker, active = e.active, "too many workers; waiting for a slot");
            }
            EventKind::PayloadInvoked => {
                debug!(target: TARGET, worker, invocation = e.invocation, "payload invoked");
            }
            EventKind::AlternateInvoked => {
                debug!(target: TARGET, worker, "alternate invoked");
            }
            EventKind::WorkerPaused => {
                debug!(target: TARGET, worker, "worker paused");
            }
            EventKind::WorkerResumed => {
                debug!(target: TARGET, worker, "worker resumed");
            }
            EventKind::StopRequested => {
                debug!(target: TARGET, worker, "stop requested");
            }
            EventKind::TimeoutHit => {
                warn!(target: TARGET, worker, timeout_ms = e.timeout_ms, "payload timed out");
            }
            EventKind::WorkerFailed => {
                warn!(target: TARGET, worker, invocation = e.invocation, reason, "worker failed");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: TARGET, "all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!(target: TARGET, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = worker, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, subscriber = worker, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
