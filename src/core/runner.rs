//! # Run a single hook or payload invocation.
//!
//! Every piece of user code a routine executes (payload, `pre`, `post`, `post_start`,
//! `alternate`) goes through [`invoke`]:
//!
//! - **Child token** derived from the worker's stop token (isolated per invocation)
//! - **Optional timeout** (`tokio::time::timeout`); on expiry the child token is
//!   cancelled, `TimeoutHit` is published and `TaskError::Timeout` returned
//! - **Panic capture** (`catch_unwind`); a panic becomes `TaskError::Panicked`
//!
//! ```text
//! invoke(task) ─► catch_unwind(task.run(child)) ─┬─► Ok(res)   → res
//!                   (optionally under timeout)   ├─► panic     → Panicked{info}
//!                                                └─► elapsed   → TimeoutHit, Timeout
//! ```
//!
//! The caller decides what an error means; `invoke` publishes only `TimeoutHit`.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::panic_message;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::Task;

/// Runs `task` once against a child of `parent`.
pub(crate) async fn invoke<T: Task + ?Sized>(
    task: &T,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    label: &str,
    bus: &Bus,
) -> Result<(), TaskError> {
    let child = parent.child_token();
    let guarded = AssertUnwindSafe(task.run(child.clone())).catch_unwind();

    let res = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, guarded).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_worker(label)
                        .with_timeout(dur),
                );
                return Err(TaskError::Timeout { timeout: dur });
            }
        },
        None => guarded.await,
    };

    res.unwrap_or_else(|panic| {
        Err(TaskError::Panicked {
            info: panic_message(panic.as_ref()),
        })
    })
}
