//! # Task abstraction.
//!
//! This module defines the [`Task`] trait (async, cancelable). Every hook of a worker
//! except `stop` and `listen` is a task: the payload itself, `pre_start`, `post_start`,
//! `pre`, `post` and `alternate`.
//!
//! A task receives the worker's stop [`CancellationToken`]. Checking it is optional:
//! a stop request never interrupts a running invocation, but a long payload may
//! watch the token to return early.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use workvisor::{Task, TaskError};
///
/// struct Flush;
///
/// #[async_trait]
/// impl Task for Flush {
///     fn name(&self) -> &str { "flush" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // write buffers...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes one invocation of the task.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;
