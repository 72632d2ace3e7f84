//! # Global runtime configuration.
//!
//! Provides [`SupervisorConfig`], the centralized settings of a supervisor.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config).build()`
//! 2. **Worker defaults**: unset timing fields of [`WorkerOptions`](crate::WorkerOptions)
//!    fall back to the config when the worker is spawned.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no admission cap)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `max_concurrent`: soft cap on admitted workers (`0` = unlimited)
/// - `poll_interval`: default sleep between listen ticks
/// - `max_concurrency_wait`: default sleep between two checks of the cap
/// - `grace`: maximum wait of [`Supervisor::stop_all`](crate::Supervisor::stop_all)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum number of admitted workers.
    ///
    /// The cap is soft: a worker that finds it reached keeps polling until a slot frees
    /// up, so it is never refused.
    pub max_concurrent: usize,

    /// Default sleep between two listen ticks.
    pub poll_interval: Duration,

    /// Default sleep between two checks of the concurrency cap.
    pub max_concurrency_wait: Duration,

    /// Maximum time `stop_all` waits for workers to exit.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages skip
    /// older items.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns the concurrency cap as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` admitted workers
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 50`
    /// - `poll_interval = 1s`
    /// - `max_concurrency_wait = 10ms`
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: 50,
            poll_interval: Duration::from_secs(1),
            max_concurrency_wait: Duration::from_millis(10),
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}
