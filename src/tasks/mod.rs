//! # Payload and hook abstractions.
//!
//! This module provides the callable types a worker is built from:
//! - [`Task`] - trait for async cancelable units (payload and most hooks)
//! - [`TaskFn`] - closure-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`ListenFn`] - condition polled by listen/one-shot workers
//! - [`StopFn`] - callback run when a worker is asked to stop

mod hooks;
mod task;
mod task_fn;

pub use hooks::{ListenFn, StopFn};
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
