//! # Workers: handle, options, specification and lifecycle flags.
//!
//! - [`Worker`] - cloneable control handle (stop / pause / reset / join)
//! - [`WorkerSpec`] - what to spawn: payload, listen condition, one-shot flag, options
//! - [`WorkerOptions`] - label, timing, admission policy and hooks
//! - [`WorkerMode`], [`WorkerState`] - mode and lifecycle state
//!
//! The routine that drives a worker lives in `core::routine`.

mod flags;
mod handle;
mod options;
mod spec;
mod state;

pub use handle::Worker;
pub use options::{Admission, WorkerOptions};
pub use spec::WorkerSpec;
pub use state::{WorkerMode, WorkerState};
