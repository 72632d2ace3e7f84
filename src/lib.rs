//! # workvisor
//!
//! **Workvisor** supervises named background workers on a tokio runtime.
//!
//! A worker runs a payload once, or re-runs it whenever a polled condition holds, or
//! runs it at most once until re-armed. Every worker lives under a unique label in a
//! [`Supervisor`]; starting a new worker under a taken label stops and joins the old
//! one first, so two workers never share a label.
//!
//! ## Architecture
//! ```text
//!   run / listen / one_shot / spawn(WorkerSpec)
//!                      │
//!                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (label → Worker, one entry per label)                 │
//! │  - Gate (soft cap on admitted workers)                            │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │WorkerRoutine │   │WorkerRoutine │   │WorkerRoutine │ ◄── Worker handle
//!   │  (run once)  │   │ (listen loop)│   │  (one shot)  │     stop / pause /
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘     reset / join
//!          │ WorkerStarting, PayloadInvoked, WorkerFailed, WorkerStopped, ...
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                            SubscriberSet
//!                      ┌────────────┼────────────┐
//!                      ▼            ▼            ▼
//!                  LogWriter     metrics       custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Created ──► Starting ──► Running ⇄ Paused ──► Stopping ──► Stopped
//!   │            │            │
//!   pre_start    post_start   { pre ─► payload ─► post }   (per true listen tick)
//!   (caller)     (routine)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Labeled workers, replace-on-conflict, bulk pause and stop.   | [`Supervisor`], [`Admission`]              |
//! | **Workers**       | Control handles and their configuration.                     | [`Worker`], [`WorkerOptions`], [`WorkerSpec`] |
//! | **Tasks**         | Payloads and hooks as async closures.                        | [`TaskRef`], [`TaskFn`], [`ListenFn`]      |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).      | [`Subscribe`]                              |
//! | **Errors**        | Typed errors for the supervisor and for worker code.         | [`RuntimeError`], [`TaskError`]            |
//! | **Configuration** | Centralized runtime settings.                                | [`SupervisorConfig`]                       |
//!
//! ## Optional features
//! - `logging` (default): exports the [`LogWriter`] subscriber, which forwards events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use workvisor::{ListenFn, Supervisor, SupervisorConfig, TaskFn, TaskRef, WorkerOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn workvisor::Subscribe>> = vec![Arc::new(workvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn workvisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let dirty = Arc::new(AtomicBool::new(true));
//!     let d = Arc::clone(&dirty);
//!     let save: TaskRef = TaskFn::arc("save", move |_ctx: CancellationToken| {
//!         let d = Arc::clone(&d);
//!         async move {
//!             d.store(false, Ordering::SeqCst);
//!             Ok(())
//!         }
//!     });
//!
//!     let cond = Arc::clone(&dirty);
//!     let w = sup
//!         .one_shot(
//!             save,
//!             ListenFn::new(move || cond.load(Ordering::SeqCst)),
//!             WorkerOptions::labeled("autosave").with_poll_interval(Duration::from_millis(10)),
//!         )
//!         .await?;
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     assert!(w.is_triggered());
//!
//!     sup.stop_all().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod subscribers;
mod tasks;
mod worker;

// ---- Public re-exports ----

pub use crate::core::{Supervisor, SupervisorBuilder, SupervisorConfig};
pub use error::{RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{ListenFn, StopFn, Task, TaskFn, TaskRef};
pub use worker::{Admission, Worker, WorkerMode, WorkerOptions, WorkerSpec, WorkerState};

// Built-in logger subscriber.
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
