//! # Worker registry - label → live worker map.
//!
//! The registry is the single source of truth for "which worker holds which label".
//!
//! ## Rules
//! - At most one entry per label.
//! - The lock is a synchronous `RwLock` and is **never** held across an await point;
//!   stopping or joining a worker always happens on a handle cloned out of the map.
//! - A routine removes only its **own** entry (compared by worker id), so a replaced
//!   worker exiting late never evicts its successor.
//!
//! ```text
//! spawn ─► insert_if_vacant(w) ─┬─► Ok        → routine runs
//!                               └─► Err(live) → admission policy decides
//! routine exit ─► remove_if_same(label, id)
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock};

use crate::worker::Worker;

#[derive(Default)]
pub(crate) struct Registry {
    workers: RwLock<HashMap<String, Worker>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `worker` unless its label is taken; returns the live holder otherwise.
    pub(crate) fn insert_if_vacant(&self, worker: Worker) -> Result<(), Worker> {
        let mut map = self.workers.write().unwrap_or_else(PoisonError::into_inner);
        match map.entry(worker.label().to_owned()) {
            Entry::Occupied(live) => Err(live.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(worker);
                Ok(())
            }
        }
    }

    /// Removes the entry for `label` if it still belongs to worker `id`.
    pub(crate) fn remove_if_same(&self, label: &str, id: u64) -> bool {
        let mut map = self.workers.write().unwrap_or_else(PoisonError::into_inner);
        match map.get(label) {
            Some(w) if w.id() == id => {
                map.remove(label);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get(&self, label: &str) -> Option<Worker> {
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .cloned()
    }

    /// Sorted labels.
    pub(crate) fn labels(&self) -> Vec<String> {
        let map = self.workers.read().unwrap_or_else(PoisonError::into_inner);
        let mut labels: Vec<String> = map.keys().cloned().collect();
        labels.sort_unstable();
        labels
    }

    /// Handles of every registered worker, sorted by label.
    pub(crate) fn snapshot(&self) -> Vec<Worker> {
        let map = self.workers.read().unwrap_or_else(PoisonError::into_inner);
        let mut workers: Vec<Worker> = map.values().cloned().collect();
        workers.sort_unstable_by(|a, b| a.label().cmp(b.label()));
        workers
    }

    pub(crate) fn len(&self) -> usize {
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
