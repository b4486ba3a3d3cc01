//! Per-OTU write serialization
//!
//! Writers to the same OTU queue on one async mutex; writers to different
//! OTUs never contend. The store's version check still guards writers in
//! other processes.
//!
//! An entry lives only while some writer holds or awaits it, so the table
//! stays bounded by the number of in-flight writes.

use dashmap::DashMap;
use otu_model::OtuId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of per-OTU mutexes
#[derive(Debug, Default)]
pub struct OtuLocks {
    locks: DashMap<OtuId, Arc<Mutex<()>>>,
}

/// Exclusive access to one OTU, released on drop
#[derive(Debug)]
pub struct OtuGuard<'a> {
    locks: &'a DashMap<OtuId, Arc<Mutex<()>>>,
    id: OtuId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OtuGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table holds the last reference once no writer holds or awaits
        // the mutex. Acquirers clone under the same shard lock.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl OtuLocks {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn acquire(&self, id: &OtuId) -> OtuGuard<'_> {
        let lock = Arc::clone(self.locks.entry(id.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        OtuGuard {
            locks: &self.locks,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of OTUs with a held or awaited lock
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
