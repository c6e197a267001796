//! Per-document write locks.
//!
//! Every mutating store operation on a document id runs while holding that
//! id's lock, so an `update` and a `delete` of the same document can never
//! interleave. Different ids never contend. An entry is removed from the
//! table as soon as its last holder or waiter is gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct IdLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Holds one id's lock until dropped.
pub struct IdGuard<'a> {
    locks: &'a IdLocks,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `id`, then takes it.
    pub async fn acquire(&self, id: &str) -> IdGuard<'_> {
        let cell = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(id.to_string()).or_default().clone()
        };
        let guard = cell.lock_owned().await;
        IdGuard {
            locks: self,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of ids currently held or awaited.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self
            .locks
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = table.get(&self.id) {
            if Arc::strong_count(cell) == 1 {
                table.remove(&self.id);
            }
        }
    }
}
