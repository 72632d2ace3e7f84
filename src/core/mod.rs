//! Runtime core: supervision and worker lifecycle.
//!
//! The public API of this module is [`Supervisor`], its [`SupervisorBuilder`] and
//! [`SupervisorConfig`].
//!
//! Internal modules:
//! - [`supervisor`]: registry owner, spawn / admission, bulk control and shutdown;
//! - [`routine`]: state machine of one worker (listen loop, hooks, exit guard);
//! - [`runner`]: one hook or payload invocation with timeout and panic capture;
//! - [`gate`]: soft concurrency cap;
//! - [`registry`]: label → worker map;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod gate;
mod registry;
mod routine;
mod runner;
mod shutdown;
mod supervisor;

use std::any::Any;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervisor::Supervisor;

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
