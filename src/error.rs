//! Error types used by the workvisor runtime and by worker hooks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] - errors returned synchronously by the [`Supervisor`](crate::Supervisor)
//!   (rejected registrations, failed `pre_start` hooks, shutdown grace overrun).
//! - [`TaskError`] - errors raised by a worker's payload or hooks. These never reach the
//!   caller of `run`/`listen`/`one_shot`; they end the worker and are kept as its
//!   [`last_error`](crate::Worker::last_error).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The `pre_start` hook failed on the caller's side; the worker was never registered.
    #[error("pre-start hook of worker '{label}' failed: {source}")]
    PreStart {
        /// Label the worker would have been registered under.
        label: String,
        /// The hook error.
        #[source]
        source: TaskError,
    },

    /// A live worker already holds the label and the admission policy is [`Admission::Reject`](crate::Admission::Reject).
    #[error("a worker is already labeled as '{label}'")]
    LabelInUse {
        /// The contested label.
        label: String,
    },

    /// `stop_all` grace period was exceeded; some workers were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Labels of the workers that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::PreStart { .. } => "runtime_pre_start_failed",
            RuntimeError::LabelInUse { .. } => "runtime_label_in_use",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::PreStart { label, source } => {
                format!("pre-start of '{label}' failed: {}", source.as_message())
            }
            RuntimeError::LabelInUse { label } => format!("label in use: {label}"),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
        }
    }
}

/// # Errors produced by a worker's payload or hooks.
///
/// Any of these ends the worker that raised it. Workers are never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A payload invocation exceeded the worker's optional timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Ordinary failure reported by user code.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A hook or the payload panicked; the panic was caught by the worker routine.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic message, when it was a string.
        info: String,
    },

    /// User code observed the stop token and bailed out.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    ///
    /// # Example
    /// ```
    /// use workvisor::TaskError;
    ///
    /// let err = TaskError::fail("disk full");
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }

    /// `Canceled` is a graceful exit, not a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}
